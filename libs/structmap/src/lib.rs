//! Bidirectional conversion between records and untyped mappings.
//!
//! - `Mapper::flatten` walks a record graph into a `Mapping` of field name
//!   to `Value`, nested records becoming nested mappings. Shared pointers
//!   (`Rc<RefCell<_>>`) are flattened once per identity; a cycle closes
//!   with a `Value::Link` back to the mapping still being filled.
//! - `Mapper::reconstruct` populates a record from a mapping (or from
//!   another record), coercing compatible scalars and building nested
//!   records, sequences and maps. Mappings reached twice yield the same
//!   `Rc`, so sharing and cycles survive the round trip.
//! - A field policy (`mapping::FieldPolicy`) renames, drops, or overrides
//!   individual fields in both directions.
//!
//! Records describe their fields through `#[derive(Record)]`.

extern crate self as structmap;

pub mod config;
pub mod converter;
pub mod error;
pub mod flatten;
pub mod mapper;
pub mod mapping;
pub mod reconstruct;
pub mod record;
mod reflect;
pub mod value;

pub use structmap_derive::Record;

pub use config::{MapperConfig, NilFields};
pub use error::{ConversionErrors, FieldError, MapperError, Mismatch};
pub use flatten::Flattener;
pub use mapper::Mapper;
pub use mapping::{Directive, FieldPolicy, Rule, ignore_nil, keep_nil};
pub use reconstruct::Reconstructor;
pub use record::{Field, FieldMut, Record, Reflect};
pub use value::{Identity, Mapping, Value, WeakMapping};

pub type Result<T, E = MapperError> = std::result::Result<T, E>;
