use std::fmt;

use crate::value::Value;

/// Mapper error, returned by `Mapper::flatten` and `Mapper::reconstruct`.
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// The source is neither a record nor a mapping. Fatal to the call.
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// Every field that could not be converted, collected over the whole call.
    #[error("{0}")]
    Conversion(ConversionErrors),

    #[error("config error: {0}")]
    Config(String),
}

impl MapperError {
    /// Field-level failures carried by a `Conversion` error.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            MapperError::Conversion(errors) => &errors.0,
            _ => &[],
        }
    }
}

/// A source value that the target type could not take.
///
/// Returned by `Reflect::assign`; the reconstructor turns it into a
/// `FieldError` at the current field path.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub expected: String,
    pub found: String,
}

impl Mismatch {
    pub fn new(expected: impl Into<String>, found: &Value) -> Self {
        Self {
            expected: expected.into(),
            found: found.describe(),
        }
    }
}

/// One field that failed to convert.
///
/// `path` is dotted from the call's root record, with `[i]` for sequence
/// elements: `owner.spouse.name`, `numbers[1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub path: String,
    pub expected: String,
    pub found: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: cannot convert {} into {}", self.path, self.found, self.expected)
    }
}

/// Field errors in the order they were hit. Displayed one per line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionErrors(pub Vec<FieldError>);

impl ConversionErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.path.as_str()).collect()
    }
}

impl fmt::Display for ConversionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl From<toml::de::Error> for MapperError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
