#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use structmap::Record;

pub type Shared<T> = Rc<RefCell<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

#[derive(Record, Debug, Default, Clone, PartialEq)]
pub struct Ident {
    pub id: String,
}

#[derive(Record, Debug, Default, Clone, PartialEq)]
pub struct Person {
    #[structmap(embed)]
    pub ident: Ident,
    pub name: String,
    pub spouse: Option<Shared<Person>>,
    pub relations: Vec<Shared<Relation>>,
}

#[derive(Record, Debug, Default, Clone, PartialEq)]
pub struct Relation {
    pub name: String,
    pub friends: Vec<Shared<Person>>,
}

#[derive(Record, Debug, Default, Clone, PartialEq)]
pub struct Car {
    pub make: String,
    pub owner: Option<Shared<Person>>,
    pub driver: Person,
    pub passengers: Vec<Person>,
    pub tags: Vec<String>,
    pub numbers: Vec<i64>,
    pub year: u16,
}

pub fn person(name: &str) -> Shared<Person> {
    shared(Person {
        name: name.to_string(),
        ..Default::default()
    })
}

/// John and Mary, married to each other.
pub fn couple() -> (Shared<Person>, Shared<Person>) {
    let john = person("John");
    let mary = person("Mary");
    john.borrow_mut().spouse = Some(mary.clone());
    mary.borrow_mut().spouse = Some(john.clone());
    (john, mary)
}
