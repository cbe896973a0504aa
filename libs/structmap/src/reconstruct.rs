use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::error::{ConversionErrors, FieldError, Mismatch};
use crate::mapper::Mapper;
use crate::mapping::Directive;
use crate::record::{Record, Reflect};
use crate::value::{Identity, Mapping, Value};

/// A source mapping reconstructed into a particular target type.
type ConstructKey = (Identity, TypeId);

/// One step of the path from the call's root record to the current field.
#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Per-call reconstruction state.
///
/// - `shared`: `Rc` targets already built from a source mapping, so that
///   every field pointing at the same mapping ends up with the same `Rc`
///   (and cycles close instead of recursing).
/// - `in_progress`: targets currently being populated; reaching one again
///   through an owned field is a cycle and is cut.
/// - `constructing`: source of the `Rc` whose pointee is about to be
///   populated. A fresh `Rc` is always populated, even if an owned target
///   of the same mapping is in progress; `shared` ends that recursion.
/// - `errors`: field-level failures, reported together when the call ends.
pub struct Reconstructor<'m> {
    mapper: &'m Mapper,
    shared: HashMap<ConstructKey, Rc<dyn Any>>,
    in_progress: HashSet<ConstructKey>,
    constructing: Option<Identity>,
    path: Vec<Segment>,
    errors: Vec<FieldError>,
}

impl<'m> Reconstructor<'m> {
    pub(crate) fn new(mapper: &'m Mapper) -> Self {
        Self {
            mapper,
            shared: HashMap::new(),
            in_progress: HashSet::new(),
            constructing: None,
            path: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Consume the state, returning every field error collected.
    pub(crate) fn finish(self) -> std::result::Result<(), ConversionErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ConversionErrors(self.errors))
        }
    }

    /// Populate `record`'s fields from the mapping behind `source`.
    ///
    /// Field failures are recorded and do not stop the remaining fields.
    /// Fails only if `source` is not a mapping at all.
    pub fn populate(
        &mut self,
        record: &mut dyn Record,
        source: &Value,
    ) -> std::result::Result<(), Mismatch> {
        let Some(mapping) = source.as_mapping() else {
            return Err(Mismatch::new(record.type_name(), source));
        };

        let fresh_shared = self.constructing.take() == Some(mapping.identity());
        let key = (mapping.identity(), record.as_any().type_id());
        let entered = self.in_progress.insert(key);
        if !entered && !fresh_shared {
            tracing::debug!(path = %self.path_string(), "cycle into owned record, left at default");
            return Ok(());
        }
        self.populate_fields(record, &mapping);
        if entered {
            self.in_progress.remove(&key);
        }
        Ok(())
    }

    /// Whether populating `record` from `source` would be cut as a cycle.
    ///
    /// Lets nullable wrappers stay empty instead of holding a default record.
    pub fn reenters(&self, record: &dyn Record, source: &Value) -> bool {
        match source.as_mapping() {
            Some(mapping) => self
                .in_progress
                .contains(&(mapping.identity(), record.as_any().type_id())),
            None => false,
        }
    }

    fn populate_fields(&mut self, record: &mut dyn Record, mapping: &Mapping) {
        let case_sensitive = self.mapper.is_case_sensitive();
        let mut targets: HashMap<String, &mut dyn Reflect> = HashMap::new();
        collect_targets(record, case_sensitive, &mut targets);

        for (key, value) in mapping.entries() {
            let rule = self.mapper.apply_policy(&key, &value);
            if rule.directive == Directive::Ignore {
                continue;
            }

            let lookup = fold_case(&rule.key, case_sensitive);
            let Some(target) = targets.get_mut(&lookup) else {
                tracing::trace!(key = %rule.key, "no matching field, skipped");
                continue;
            };

            let value = rule.value.unwrap_or(value);
            if value.is_null() && !target.is_nullable() {
                continue;
            }

            self.path.push(Segment::Key(rule.key));
            let result = match rule.directive {
                Directive::Custom => {
                    if target.assign_raw(&value) {
                        Ok(())
                    } else {
                        Err(Mismatch::new(target.type_name(), &value))
                    }
                }
                _ => target.assign(&value, self),
            };
            if let Err(mismatch) = result {
                self.record(mismatch);
            }
            self.path.pop();
        }
    }

    /// Build the `Rc` for a shared-pointer target.
    ///
    /// A mapping source is looked up by identity first: a hit returns the
    /// `Rc` already built for it (possibly still being populated, which is
    /// how cycles close). On a miss the zero-valued `Rc` is cached before
    /// its fields are populated.
    pub fn construct_shared<T: Reflect + Default>(
        &mut self,
        source: &Value,
    ) -> std::result::Result<Rc<RefCell<T>>, Mismatch> {
        let Some(mapping) = source.as_mapping() else {
            let mut value = T::default();
            value.assign(source, self)?;
            return Ok(Rc::new(RefCell::new(value)));
        };

        let key = (mapping.identity(), TypeId::of::<T>());
        if let Some(cached) = self.shared.get(&key) {
            if let Ok(rc) = Rc::clone(cached).downcast::<RefCell<T>>() {
                tracing::trace!(identity = %key.0, "reusing constructed value");
                return Ok(rc);
            }
        }

        let rc = Rc::new(RefCell::new(T::default()));
        self.shared.insert(key, rc.clone());
        self.constructing = Some(key.0);
        let assigned = rc.borrow_mut().assign(source, self);
        self.constructing = None;
        assigned?;
        Ok(rc)
    }

    /// Convert one sequence element; a failure is recorded at `field[index]`
    /// and leaves the element at its default.
    pub fn element(&mut self, index: usize, target: &mut dyn Reflect, source: &Value) {
        self.path.push(Segment::Index(index));
        if let Err(mismatch) = self.convert(target, source) {
            self.record(mismatch);
        }
        self.path.pop();
    }

    /// Convert one map entry. Returns `false` if the entry could not be
    /// converted; the caller drops it.
    ///
    /// An entry fails as a whole: errors raised inside a record-valued entry
    /// are discarded with it rather than reported.
    pub fn entry(&mut self, key: &str, target: &mut dyn Reflect, source: &Value) -> bool {
        self.path.push(Segment::Key(key.to_string()));
        let recorded = self.errors.len();
        let converted = match self.convert(target, source) {
            Ok(()) if self.errors.len() == recorded => true,
            Ok(()) => {
                tracing::debug!(
                    path = %self.path_string(),
                    errors = self.errors.len() - recorded,
                    "map entry skipped"
                );
                self.errors.truncate(recorded);
                false
            }
            Err(mismatch) => {
                tracing::debug!(
                    path = %self.path_string(),
                    expected = %mismatch.expected,
                    found = %mismatch.found,
                    "map entry skipped"
                );
                false
            }
        };
        self.path.pop();
        converted
    }

    /// `Null` is skipped for targets that cannot hold it.
    fn convert(&mut self, target: &mut dyn Reflect, source: &Value) -> std::result::Result<(), Mismatch> {
        if source.is_null() && !target.is_nullable() {
            return Ok(());
        }
        target.assign(source, self)
    }

    fn record(&mut self, mismatch: Mismatch) {
        self.errors.push(FieldError {
            path: self.path_string(),
            expected: mismatch.expected,
            found: mismatch.found,
        });
    }

    fn path_string(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            if matches!(segment, Segment::Key(_)) && !out.is_empty() {
                out.push('.');
            }
            out.push_str(&segment.to_string());
        }
        out
    }
}

/// Writable fields of `record` by lookup name, embedded records promoted.
fn collect_targets<'a>(
    record: &'a mut dyn Record,
    case_sensitive: bool,
    out: &mut HashMap<String, &'a mut dyn Reflect>,
) {
    for field in record.fields_mut() {
        let value = field.value;
        if field.embedded && value.as_record().is_some() {
            if let Some(inner) = value.as_record_mut() {
                collect_targets(inner, case_sensitive, out);
            }
            continue;
        }
        out.insert(fold_case(field.name, case_sensitive), value);
    }
}

pub(crate) fn fold_case(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}
