use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable handle distinguishing "the same object" from an equal-valued copy.
///
/// Derived from the address of a shared allocation (`Rc` of a record or of
/// a `Mapping`). Only meaningful while that allocation is alive, which is
/// always the case for the duration of a single mapper call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(usize);

impl Identity {
    pub fn of<T: ?Sized>(rc: &Rc<T>) -> Self {
        Self(Rc::as_ptr(rc) as *const () as usize)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

/// Untyped value produced by flattening and consumed by reconstruction.
///
/// Strategy by kind:
/// - Scalars: signed integers widen to `Int`, unsigned to `UInt`, floats to `Float`.
/// - `Array`: sequences and fixed-size arrays, elements flattened individually.
/// - `Map`: nested records and string-keyed maps, shared by handle.
/// - `Link`: back edge to a mapping whose record was still being flattened
///   when the cycle closed. Does not keep the target alive.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Map(Mapping),
    Link(WeakMapping),
}

impl Value {
    /// `Null` or a link whose target no longer exists.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Link(link) => link.upgrade().is_none(),
            _ => false,
        }
    }

    /// The mapping behind a `Map` or a live `Link`.
    pub fn as_mapping(&self) -> Option<Mapping> {
        match self {
            Value::Map(m) => Some(m.clone()),
            Value::Link(link) => link.upgrade(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Short kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Link(_) => "link",
        }
    }

    /// `kind` plus the scalar itself, e.g. `string "old"` or `int 5`.
    pub fn describe(&self) -> String {
        match self {
            Value::Bool(v) => format!("bool {v}"),
            Value::Int(v) => format!("int {v}"),
            Value::UInt(v) => format!("uint {v}"),
            Value::Float(v) => format!("float {v}"),
            Value::String(v) => format!("string {v:?}"),
            Value::Array(items) => format!("array of {}", items.len()),
            other => other.kind().to_string(),
        }
    }
}

/// Mappings and links compare by identity: a deep comparison of a cyclic
/// graph would never terminate.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(_) | Value::Link(_), Value::Map(_) | Value::Link(_)) => {
                match (self.as_mapping(), other.as_mapping()) {
                    (Some(a), Some(b)) => a.ptr_eq(&b),
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => write!(f, "{v:?}"),
            Value::Int(v) => write!(f, "{v:?}"),
            Value::UInt(v) => write!(f, "{v:?}u"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Array(items) => f.debug_list().entries(items).finish(),
            Value::Map(m) => fmt::Debug::fmt(m, f),
            Value::Link(link) => match link.upgrade() {
                Some(m) => write!(f, "<link {}>", m.identity()),
                None => f.write_str("<dangling link>"),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Mapping> for Value {
    fn from(m: Mapping) -> Self {
        Value::Map(m)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Bool(v),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Value::Int(v)
                } else if let Some(v) = n.as_u64() {
                    Value::UInt(v)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(object) => {
                let mapping = Mapping::new();
                for (key, value) in object {
                    mapping.insert(key, Value::from(value));
                }
                Value::Map(mapping)
            }
        }
    }
}

/// Links serialize as `null`; everything reachable through strong handles
/// is written out in full.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null | Value::Link(_) => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(m) => m.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

/// Mapping from field name to value, shared by handle.
///
/// Cloning a `Mapping` yields another handle to the same entries; use
/// `identity()` / `ptr_eq()` to tell shared mappings from equal ones.
/// Keys iterate in sorted order.
#[derive(Clone, Default)]
pub struct Mapping(Rc<RefCell<BTreeMap<String, Value>>>);

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }

    pub fn ptr_eq(&self, other: &Mapping) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakMapping {
        WeakMapping(Rc::downgrade(&self.0))
    }

    /// Insert an entry, returning the value previously stored under `key`.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().remove(key)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    /// Snapshot of all entries. Values are cloned, so nested mappings are
    /// still shared with this one.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Borrow the underlying entries. Panics if an `insert`/`remove` is
    /// running on the same mapping.
    pub fn borrow(&self) -> Ref<'_, BTreeMap<String, Value>> {
        self.0.borrow()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mapping = Mapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.borrow().iter()).finish()
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.0.borrow();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Non-owning handle to a `Mapping`, stored in `Value::Link`.
#[derive(Clone, Default)]
pub struct WeakMapping(Weak<RefCell<BTreeMap<String, Value>>>);

impl WeakMapping {
    pub fn upgrade(&self) -> Option<Mapping> {
        self.0.upgrade().map(Mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_clone_shares_entries() {
        let a = Mapping::new();
        let b = a.clone();
        b.insert("name", "John");

        assert!(a.ptr_eq(&b));
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.get("name"), Some(Value::from("John")));
    }

    #[test]
    fn equal_contents_are_not_the_same_mapping() {
        let a: Mapping = [("name", "John")].into_iter().collect();
        let b: Mapping = [("name", "John")].into_iter().collect();

        assert_ne!(a.identity(), b.identity());
        assert_ne!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn link_reads_through_while_target_lives() {
        let target = Mapping::new();
        let link = Value::Link(target.downgrade());

        assert!(!link.is_null());
        assert_eq!(link, Value::Map(target.clone()));

        drop(target);
        assert!(link.is_null());
        assert!(link.as_mapping().is_none());
    }

    #[test]
    fn json_objects_become_mappings() {
        let json = serde_json::json!({
            "make": "Toyota",
            "numbers": [1, 2, 3],
            "owner": { "name": "John", "age": 42 },
            "ratio": 0.5,
        });

        let value = Value::from(json);
        let root = value.as_mapping().expect("object maps to a mapping");
        assert_eq!(root.get("make"), Some(Value::from("Toyota")));
        assert_eq!(
            root.get("numbers").and_then(|v| v.as_array().map(<[Value]>::len)),
            Some(3)
        );
        assert_eq!(root.get("ratio"), Some(Value::Float(0.5)));

        let owner = root.get("owner").and_then(|v| v.as_mapping()).expect("nested mapping");
        assert_eq!(owner.get("age"), Some(Value::Int(42)));
    }

    #[test]
    fn links_serialize_as_null() {
        let john = Mapping::new();
        let mary = Mapping::new();
        john.insert("name", "John");
        john.insert("spouse", Value::Map(mary.clone()));
        mary.insert("name", "Mary");
        mary.insert("spouse", Value::Link(john.downgrade()));

        let json = serde_json::to_value(Value::Map(john)).expect("serializable");
        assert_eq!(
            json,
            serde_json::json!({
                "name": "John",
                "spouse": { "name": "Mary", "spouse": null },
            })
        );
    }

    #[test]
    fn describe_includes_scalar() {
        assert_eq!(Value::from("old").describe(), "string \"old\"");
        assert_eq!(Value::Int(5).describe(), "int 5");
        assert_eq!(Value::from(vec![1i64, 2]).describe(), "array of 2");
        assert_eq!(Value::Map(Mapping::new()).describe(), "map");
    }
}
