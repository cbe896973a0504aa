use std::fmt;
use std::sync::Arc;

use crate::Result;
use crate::config::{MapperConfig, NilFields};
use crate::error::MapperError;
use crate::flatten::Flattener;
use crate::mapping::{FieldPolicy, Rule, ignore_nil, keep_nil};
use crate::reconstruct::Reconstructor;
use crate::record::{Record, Reflect};
use crate::value::{Mapping, Value};

/// Converts records to mappings and back.
///
/// Holds only read-only configuration (field policy, case sensitivity);
/// all traversal state lives in a `Flattener` / `Reconstructor` created per
/// call, so one `Mapper` can serve any number of calls, on any thread.
#[derive(Clone)]
pub struct Mapper {
    policy: FieldPolicy,
    case_sensitive: bool,
}

impl Mapper {
    /// Case-sensitive mapper that drops nil fields.
    pub fn new() -> Self {
        Self {
            policy: Arc::new(ignore_nil),
            case_sensitive: true,
        }
    }

    /// Case-sensitive mapper with a custom field policy.
    pub fn with_policy<F>(policy: F) -> Self
    where
        F: Fn(&str, &dyn Reflect) -> Rule + Send + Sync + 'static,
    {
        Self::new().policy(policy)
    }

    pub fn from_config(config: &MapperConfig) -> Self {
        let policy: FieldPolicy = match config.nil_fields {
            NilFields::Ignore => Arc::new(ignore_nil),
            NilFields::Keep => Arc::new(keep_nil),
        };
        Self {
            policy,
            case_sensitive: config.case_sensitive,
        }
    }

    pub fn policy<F>(mut self, policy: F) -> Self
    where
        F: Fn(&str, &dyn Reflect) -> Rule + Send + Sync + 'static,
    {
        self.policy = Arc::new(policy);
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub(crate) fn apply_policy(&self, name: &str, value: &dyn Reflect) -> Rule {
        (self.policy)(name, value)
    }

    /// Flatten a record into a mapping.
    ///
    /// Accepts a record, a shared pointer to one, or something that already
    /// is a mapping (`Value::Map`, a string-keyed map), which is returned as
    /// its mapping. Anything else is `MapperError::InvalidSource`.
    pub fn flatten(&self, source: &dyn Reflect) -> Result<Mapping> {
        let mut flattener = Flattener::new(self);
        let flattened = match source.as_record() {
            Some(record) => Value::Map(flattener.flatten_record(record)?),
            None => source.flatten_value(&mut flattener)?,
        };
        flattened.as_mapping().ok_or_else(|| {
            MapperError::InvalidSource(format!(
                "expected a record or a mapping, got {} ({})",
                source.type_name(),
                flattened.kind()
            ))
        })
    }

    /// Populate `target` from a mapping or from another record.
    ///
    /// A record source is flattened first. Every field is attempted; the
    /// ones that could not be converted are returned together as
    /// `MapperError::Conversion`, the others keep their new values.
    pub fn reconstruct(&self, source: &dyn Reflect, target: &mut dyn Record) -> Result<()> {
        let mapping = self.flatten(source)?;
        tracing::debug!(
            source = %source.type_name(),
            target = %target.type_name(),
            keys = mapping.len(),
            "reconstructing"
        );

        let mut cx = Reconstructor::new(self);
        if let Err(mismatch) = cx.populate(target, &Value::Map(mapping)) {
            return Err(MapperError::InvalidSource(format!(
                "cannot populate {} from {}",
                mismatch.expected, mismatch.found
            )));
        }
        cx.finish().map_err(|errors| {
            tracing::debug!(errors = errors.len(), "reconstruction finished with errors");
            MapperError::Conversion(errors)
        })
    }

    /// Build a fresh `T` from a mapping or another record.
    pub fn to_record<T: Record + Default>(&self, source: &dyn Reflect) -> Result<T> {
        let mut target = T::default();
        self.reconstruct(source, &mut target)?;
        Ok(target)
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("case_sensitive", &self.case_sensitive)
            .finish_non_exhaustive()
    }
}
