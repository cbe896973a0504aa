use serde::Deserialize;

use crate::error::MapperError;

/// How the built-in policy treats nil fields (`None`, `Null`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NilFields {
    /// Nil fields are left out of flattened mappings and never written to targets.
    #[default]
    Ignore,
    /// Nil fields are flattened to `Null` and clear nullable targets.
    Keep,
}

/// Mapper configuration, parsed from TOML.
///
/// ```toml
/// case_sensitive = false
/// nil_fields = "keep"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Whether reconstruction matches keys to field names exactly.
    /// When `false`, both sides are folded to lowercase for lookup.
    pub case_sensitive: bool,

    /// Nil handling of the built-in field policy.
    pub nil_fields: NilFields,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            nil_fields: NilFields::Ignore,
        }
    }
}

impl MapperConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, MapperError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| MapperError::Config(format!("{path}: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, MapperError> {
        Ok(toml::from_str(toml_str)?)
    }
}
