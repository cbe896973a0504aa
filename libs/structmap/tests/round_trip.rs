mod common;

use std::collections::BTreeMap;
use std::rc::Rc;

use proptest::prelude::*;
use structmap::{Mapper, Record, Value};

use common::{Car, Person, Relation, couple, person, shared};

fn sample_car() -> Car {
    let (john, mary) = couple();
    let friends = vec![person("Friend1"), person("Friend2")];
    john.borrow_mut().relations = vec![shared(Relation {
        name: String::new(),
        friends,
    })];

    let passengers = vec![john.borrow().clone(), mary.borrow().clone()];
    Car {
        make: "Toyota".into(),
        owner: Some(john),
        driver: Person {
            name: "Mark".into(),
            ..Default::default()
        },
        passengers,
        tags: vec!["tag1".into(), "tag2".into()],
        numbers: vec![1, 2, 3],
        year: 2024,
    }
}

/// Cut Owner ↔ Spouse so derived `PartialEq` terminates.
fn break_cycle(car: &Car) {
    let owner = car.owner.as_ref().expect("owner");
    let spouse = owner.borrow().spouse.clone().expect("spouse");
    spouse.borrow_mut().spouse = None;
}

#[test]
fn car_flattens_with_cycle_represented_once() {
    let car = sample_car();
    let mapper = Mapper::new();

    let mapping = mapper.flatten(&car).expect("flatten");
    assert_eq!(mapping.get("make"), Some(Value::from("Toyota")));
    assert_eq!(mapping.get("year"), Some(Value::UInt(2024)));

    let owner = mapping.get("owner").and_then(|v| v.as_mapping()).expect("owner");
    assert_eq!(owner.get("name"), Some(Value::from("John")));

    let spouse = owner.get("spouse").and_then(|v| v.as_mapping()).expect("owner.spouse");
    assert_eq!(spouse.get("name"), Some(Value::from("Mary")));

    let back = spouse.get("spouse").expect("owner.spouse.spouse");
    assert!(matches!(back, Value::Link(_)));
    assert!(back.as_mapping().expect("live").ptr_eq(&owner));

    break_cycle(&car);
}

#[test]
fn car_round_trips_through_mapping() {
    let car = sample_car();
    let mapper = Mapper::new();

    let mapping = mapper.flatten(&car).expect("flatten");
    let mut rebuilt = Car::default();
    mapper.reconstruct(&mapping, &mut rebuilt).expect("reconstruct");

    {
        let owner = car.owner.as_ref().expect("owner").borrow();
        let new_owner = rebuilt.owner.as_ref().expect("rebuilt owner").borrow();
        let spouse = owner.spouse.as_ref().expect("spouse").borrow();
        let new_spouse = new_owner.spouse.as_ref().expect("rebuilt spouse").borrow();

        assert_eq!(rebuilt.make, "Toyota");
        assert_eq!(new_owner.name, owner.name);
        assert_eq!(new_spouse.name, spouse.name);
        assert_eq!(
            new_spouse.spouse.as_ref().expect("cycle").borrow().name,
            spouse.spouse.as_ref().expect("cycle").borrow().name,
        );
    }

    // The cycle closes on the very same Rc, not a copy.
    let new_owner = rebuilt.owner.clone().expect("rebuilt owner");
    let new_spouse = new_owner.borrow().spouse.clone().expect("rebuilt spouse");
    let closing = new_spouse.borrow().spouse.clone().expect("closing edge");
    assert!(Rc::ptr_eq(&closing, &new_owner));

    break_cycle(&car);
    break_cycle(&rebuilt);
    assert_eq!(car, rebuilt);
}

#[test]
fn record_source_is_flattened_first() {
    let car = sample_car();
    let mapper = Mapper::new();

    let rebuilt: Car = mapper.to_record(&car).expect("reconstruct from record");
    assert_eq!(rebuilt.passengers.len(), 2);
    assert_eq!(rebuilt.passengers[1].name, "Mary");
    assert_eq!(rebuilt.tags, car.tags);

    break_cycle(&car);
    break_cycle(&rebuilt);
}

#[test]
fn mutual_spouses_terminate_with_both_sides_populated() {
    let (john, mary) = couple();
    let mapper = Mapper::new();

    let from_john = mapper.flatten(&john).expect("flatten");
    let to_mary = from_john.get("spouse").and_then(|v| v.as_mapping()).expect("john.spouse");
    let to_john = to_mary.get("spouse").and_then(|v| v.as_mapping()).expect("mary.spouse");

    assert_eq!(to_mary.get("name"), Some(Value::from("Mary")));
    assert!(to_john.ptr_eq(&from_john));

    mary.borrow_mut().spouse = None;
}

#[test]
fn owned_root_closes_the_cycle_through_a_fresh_rc() {
    let (john, mary) = couple();
    let mapper = Mapper::new();

    let rebuilt: Person = mapper.to_record(&john).expect("reconstruct");
    let new_mary = rebuilt.spouse.clone().expect("spouse");
    let new_john = new_mary.borrow().spouse.clone().expect("spouse.spouse");

    assert_eq!(rebuilt.name, "John");
    assert_eq!(new_mary.borrow().name, "Mary");
    assert_eq!(new_john.borrow().name, "John");

    let closing = new_john.borrow().spouse.clone().expect("spouse.spouse.spouse");
    assert!(Rc::ptr_eq(&closing, &new_mary));

    mary.borrow_mut().spouse = None;
    new_mary.borrow_mut().spouse = None;
    assert_eq!(rebuilt, *john.borrow());
}

#[test]
fn car_round_trips_with_explicit_nils() {
    let car = sample_car();
    let mapper = Mapper::from_config(&structmap::MapperConfig {
        nil_fields: structmap::NilFields::Keep,
        ..Default::default()
    });

    let mapping = mapper.flatten(&car).expect("flatten");
    let driver = mapping.get("driver").and_then(|v| v.as_mapping()).expect("driver");
    assert_eq!(driver.get("spouse"), Some(Value::Null));

    let rebuilt: Car = mapper.to_record(&mapping).expect("reconstruct");
    let new_owner = rebuilt.owner.clone().expect("rebuilt owner");
    let new_spouse = new_owner.borrow().spouse.clone().expect("rebuilt spouse");
    let closing = new_spouse.borrow().spouse.clone().expect("closing edge");
    assert!(Rc::ptr_eq(&closing, &new_owner));
    assert!(rebuilt.driver.spouse.is_none());

    break_cycle(&car);
    break_cycle(&rebuilt);
    assert_eq!(car, rebuilt);
}

#[derive(Record, Debug, Default)]
struct Household {
    head: Option<common::Shared<Person>>,
    contact: Option<common::Shared<Person>>,
}

#[test]
fn shared_reference_survives_reconstruction() {
    let john = person("John");
    let home = Household {
        head: Some(john.clone()),
        contact: Some(john),
    };
    let mapper = Mapper::new();

    let mapping = mapper.flatten(&home).expect("flatten");
    let rebuilt: Household = mapper.to_record(&mapping).expect("reconstruct");

    let head = rebuilt.head.expect("head");
    let contact = rebuilt.contact.expect("contact");
    assert!(Rc::ptr_eq(&head, &contact));
    assert_eq!(head.borrow().name, "John");
}

#[test]
fn distinct_equal_records_stay_distinct() {
    let home = Household {
        head: Some(person("John")),
        contact: Some(person("John")),
    };
    let mapper = Mapper::new();

    let rebuilt: Household = mapper.to_record(&home).expect("reconstruct");
    let head = rebuilt.head.expect("head");
    let contact = rebuilt.contact.expect("contact");
    assert!(!Rc::ptr_eq(&head, &contact));
    assert_eq!(*head.borrow(), *contact.borrow());
}

#[derive(Record, Debug, Default, Clone, PartialEq)]
struct Inner {
    code: String,
    weight: f64,
    tags: BTreeMap<String, i64>,
}

#[derive(Record, Debug, Default, Clone, PartialEq)]
struct Sample {
    flag: bool,
    small: i8,
    count: u32,
    big: i64,
    label: String,
    initial: char,
    scores: Vec<i32>,
    nested: Inner,
    maybe: Option<u16>,
    grid: [u8; 3],
}

prop_compose! {
    fn arb_inner()(
        code in "[A-Z]{0,4}",
        weight in -1.0e6f64..1.0e6,
        tags in prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..4),
    ) -> Inner {
        Inner { code, weight, tags }
    }
}

prop_compose! {
    fn arb_sample()(
        flag in any::<bool>(),
        small in any::<i8>(),
        count in any::<u32>(),
        big in any::<i64>(),
        label in ".{0,12}",
        initial in any::<char>(),
        scores in prop::collection::vec(any::<i32>(), 0..8),
        nested in arb_inner(),
        maybe in prop::option::of(any::<u16>()),
        grid in any::<[u8; 3]>(),
    ) -> Sample {
        Sample { flag, small, count, big, label, initial, scores, nested, maybe, grid }
    }
}

proptest! {
    #[test]
    fn scalar_records_round_trip(sample in arb_sample()) {
        let mapper = Mapper::new();
        let mapping = mapper.flatten(&sample).unwrap();
        let rebuilt: Sample = mapper.to_record(&mapping).unwrap();
        prop_assert_eq!(rebuilt, sample);
    }

    #[test]
    fn scalar_records_round_trip_with_explicit_nils(sample in arb_sample()) {
        let mapper = Mapper::from_config(&structmap::MapperConfig {
            nil_fields: structmap::NilFields::Keep,
            ..Default::default()
        });
        let mapping = mapper.flatten(&sample).unwrap();
        let rebuilt: Sample = mapper.to_record(&mapping).unwrap();
        prop_assert_eq!(rebuilt, sample);
    }
}
