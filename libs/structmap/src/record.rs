use std::any::Any;

use crate::Result;
use crate::converter::short_type_name;
use crate::error::Mismatch;
use crate::flatten::Flattener;
use crate::reconstruct::Reconstructor;
use crate::value::Value;

/// Runtime view of a value the mapper can read and write.
///
/// Implemented for scalars, `String`, `Value`, `Option`, `Box`,
/// `Rc<RefCell<_>>`, sequences, string-keyed maps, and every
/// `#[derive(Record)]` type.
pub trait Reflect: Any {
    /// Short type name for diagnostics (`Vec<i64>`, `Person`).
    fn type_name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    fn as_any(&self) -> &dyn Any;

    /// `None`, `Null`, or a dangling link.
    fn is_nil(&self) -> bool {
        false
    }

    /// Whether a `Null` source is written into this target (clearing it)
    /// instead of being skipped.
    fn is_nullable(&self) -> bool {
        false
    }

    fn as_record(&self) -> Option<&dyn Record> {
        None
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        None
    }

    /// Flatten this value: records become mappings, sequences arrays,
    /// scalars their `Value` counterpart.
    fn flatten_value(&self, cx: &mut Flattener<'_>) -> Result<Value>;

    /// Write `source` into `self`, coercing compatible types and
    /// constructing nested records, sequences and maps.
    fn assign(&mut self, source: &Value, cx: &mut Reconstructor<'_>) -> std::result::Result<(), Mismatch>;

    /// Raw conversion used by `Directive::Custom`: lossy casts, no
    /// recursion. Returns `false` if `source` has no raw form for this type.
    fn assign_raw(&mut self, _source: &Value) -> bool {
        false
    }
}

/// A composite value with named fields, usually via `#[derive(Record)]`.
pub trait Record: Reflect {
    /// Fields in declaration order.
    fn fields(&self) -> Vec<Field<'_>>;

    /// Fields in declaration order, writable.
    fn fields_mut(&mut self) -> Vec<FieldMut<'_>>;
}

/// Descriptor of one record field.
pub struct Field<'a> {
    /// Key used in mappings (field ident or `rename`).
    pub name: &'static str,
    /// Nested record whose fields are promoted into the parent.
    pub embedded: bool,
    pub value: &'a dyn Reflect,
}

pub struct FieldMut<'a> {
    pub name: &'static str,
    pub embedded: bool,
    pub value: &'a mut dyn Reflect,
}
