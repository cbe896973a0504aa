use std::collections::HashMap;

use crate::Result;
use crate::mapper::Mapper;
use crate::mapping::Directive;
use crate::record::{Record, Reflect};
use crate::value::{Identity, Mapping, Value};

/// Progress of one shared record within a flatten call.
enum Resolution {
    /// Fields are being written into this mapping right now; reaching the
    /// identity again means the graph has a cycle.
    Resolving(Mapping),
    /// Fully flattened; later occurrences share the mapping.
    Resolved(Mapping),
}

/// Per-call flatten state: resolution markers keyed by pointer identity.
///
/// Created fresh by `Mapper::flatten` and dropped when it returns.
pub struct Flattener<'m> {
    mapper: &'m Mapper,
    resolutions: HashMap<Identity, Resolution>,
}

impl<'m> Flattener<'m> {
    pub(crate) fn new(mapper: &'m Mapper) -> Self {
        Self {
            mapper,
            resolutions: HashMap::new(),
        }
    }

    /// Flatten a record into a fresh mapping.
    pub fn flatten_record(&mut self, record: &dyn Record) -> Result<Mapping> {
        let out = Mapping::new();
        self.flatten_fields(record, &out)?;
        Ok(out)
    }

    /// Flatten the record behind a shared pointer, at most once per identity.
    ///
    /// - first visit: the mapping is registered as resolving, filled, then
    ///   marked resolved;
    /// - visit while resolving (cycle): a `Link` to the mapping being filled;
    /// - visit after resolving: the same mapping, shared.
    ///
    /// Pointees that are not records are flattened directly.
    pub fn flatten_shared(&mut self, identity: Identity, pointee: &dyn Reflect) -> Result<Value> {
        let Some(record) = pointee.as_record() else {
            return pointee.flatten_value(self);
        };

        match self.resolutions.get(&identity) {
            Some(Resolution::Resolving(mapping)) => {
                tracing::trace!(%identity, "cycle closed, linking back");
                return Ok(Value::Link(mapping.downgrade()));
            }
            Some(Resolution::Resolved(mapping)) => {
                tracing::trace!(%identity, "already flattened, sharing");
                return Ok(Value::Map(mapping.clone()));
            }
            None => {}
        }

        let mapping = Mapping::new();
        self.resolutions
            .insert(identity, Resolution::Resolving(mapping.clone()));
        self.flatten_fields(record, &mapping)?;
        self.resolutions
            .insert(identity, Resolution::Resolved(mapping.clone()));
        Ok(Value::Map(mapping))
    }

    fn flatten_fields(&mut self, record: &dyn Record, out: &Mapping) -> Result<()> {
        for field in record.fields() {
            let rule = self.mapper.apply_policy(field.name, field.value);
            match rule.directive {
                Directive::Ignore => continue,
                Directive::Custom => {
                    out.insert(rule.key, rule.value.unwrap_or_default());
                    continue;
                }
                Directive::Default => {}
            }

            if let Some(value) = rule.value {
                out.insert(rule.key, value);
                continue;
            }

            // Embedded records write straight into the parent; last write wins.
            if field.embedded {
                if let Some(inner) = field.value.as_record() {
                    self.flatten_fields(inner, out)?;
                    continue;
                }
            }

            let value = field.value.flatten_value(self)?;
            out.insert(rule.key, value);
        }
        Ok(())
    }
}
