//! Conversion configuration (morph.toml)
//!
//! ```toml
//! common_mapping = "common"
//! naming = "snake_case"
//! naming_excludes = ["ISBN"]
//! max_depth = 64
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::naming::{CaseNaming, Convention, ExcludingNaming, IdentityNaming, NamingStrategy};
use crate::registry::COMMON_MAPPING;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionConfig {
    /// Mapping name used when none is given or the requested one is unknown
    #[serde(default = "default_common_mapping")]
    pub common_mapping: String,

    /// Case convention of payload keys
    #[serde(default)]
    pub naming: Convention,

    /// Logical names never translated by the naming strategy
    #[serde(default)]
    pub naming_excludes: Vec<String>,

    /// Maximum nesting depth of one conversion (unlimited when absent)
    #[serde(default)]
    pub max_depth: Option<usize>,
}

fn default_common_mapping() -> String {
    COMMON_MAPPING.to_string()
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            common_mapping: default_common_mapping(),
            naming: Convention::default(),
            naming_excludes: Vec::new(),
            max_depth: None,
        }
    }
}

impl ConversionConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from TOML
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ConversionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.common_mapping.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "common_mapping cannot be empty".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(ConfigError::Invalid(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Naming strategy described by `naming` and `naming_excludes`
    pub fn naming_strategy(&self) -> Arc<dyn NamingStrategy> {
        match (self.naming, self.naming_excludes.is_empty()) {
            (Convention::Identity, _) => Arc::new(IdentityNaming),
            (convention, true) => Arc::new(CaseNaming(convention)),
            (convention, false) => Arc::new(
                self.naming_excludes
                    .iter()
                    .fold(ExcludingNaming::new(CaseNaming(convention)), |naming, name| {
                        naming.exclude_name(name.clone())
                    }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ConversionConfig::from_toml_str("").unwrap();
        assert_eq!(config, ConversionConfig::default());
        assert_eq!(config.common_mapping, "common");
        assert_eq!(config.max_depth, None);
    }

    #[test]
    fn test_parse_full() {
        let config = ConversionConfig::from_toml_str(
            r#"
common_mapping = "default"
naming = "snake_case"
naming_excludes = ["ISBN"]
max_depth = 16
"#,
        )
        .unwrap();

        assert_eq!(config.common_mapping, "default");
        assert_eq!(config.naming, Convention::SnakeCase);
        assert_eq!(config.max_depth, Some(16));

        let naming = config.naming_strategy();
        assert_eq!(naming.convert("pageCount", None), "page_count");
        assert_eq!(naming.convert("ISBN", None), "ISBN");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ConversionConfig::from_toml_str("common_mapping = \"\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ConversionConfig::from_toml_str("max_depth = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ConversionConfig::from_toml_str("naming = \"shouting\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ConversionConfig::from_toml_str("unknown = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "naming = \"camel_case\"").unwrap();

        let config = ConversionConfig::load(file.path()).unwrap();
        assert_eq!(config.naming, Convention::CamelCase);
        assert_eq!(
            config.naming_strategy().convert("page_count", None),
            "pageCount"
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ConversionConfig::load(&dir.path().join("morph.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
