use std::fmt;
use std::sync::Arc;

use crate::record::Reflect;
use crate::value::Value;

/// How a single field is treated by both conversion directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Use the field under the rule's key, converting its value normally.
    Default,
    /// Write the rule's value as-is, bypassing type coercion.
    Custom,
    /// Drop the field from the flattened mapping / leave the target untouched.
    Ignore,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Directive::Default => "Default",
            Directive::Custom => "Custom",
            Directive::Ignore => "Ignore",
        };
        f.write_str(name)
    }
}

/// Policy outcome for one field.
///
/// - `Default` + `value: None` → key possibly renamed, value untouched.
/// - `Default` + `value: Some` → value replaced, then converted as usual.
/// - `Custom` → `value` written raw (`None` writes `Null`).
/// - `Ignore` → field skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub directive: Directive,
    pub key: String,
    pub value: Option<Value>,
}

impl Rule {
    pub fn keep(key: impl Into<String>) -> Self {
        Self { directive: Directive::Default, key: key.into(), value: None }
    }

    pub fn rewrite(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { directive: Directive::Default, key: key.into(), value: Some(value.into()) }
    }

    pub fn custom(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { directive: Directive::Custom, key: key.into(), value: Some(value.into()) }
    }

    pub fn ignore(key: impl Into<String>) -> Self {
        Self { directive: Directive::Ignore, key: key.into(), value: None }
    }
}

/// Field-name policy: `(declared name, current value) -> Rule`.
///
/// Called for every record field while flattening (value is the field
/// itself) and for every mapping entry while reconstructing (value is the
/// entry's `Value`). Must not depend on call order.
pub type FieldPolicy = Arc<dyn Fn(&str, &dyn Reflect) -> Rule + Send + Sync>;

/// Nil values (`None`, `Null`) are dropped; everything else passes through.
pub fn ignore_nil(key: &str, value: &dyn Reflect) -> Rule {
    if value.is_nil() {
        Rule::ignore(key)
    } else {
        Rule::keep(key)
    }
}

/// Every field passes through; nil values are written as explicit `Null`.
pub fn keep_nil(key: &str, _value: &dyn Reflect) -> Rule {
    Rule::keep(key)
}
