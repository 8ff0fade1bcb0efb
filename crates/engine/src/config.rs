//! Database configuration
//!
//! `CortexConfig` is plain serde data. It can be built in code, or loaded
//! from TOML where every section and field is optional:
//!
//! ```toml
//! environment = "test"
//!
//! [limits]
//! max_content_bytes = 65536
//!
//! [search]
//! default_limit = 10
//! category_boost = 1.3
//! ```
//!
//! A running database holds its config behind a lock and can be changed with
//! `Database::update_config`. Every change is validated before it applies.

use cortex_core::{CortexError, CortexResult};
use cortex_security::Environment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CortexConfig {
    /// Deployment environment; gates destructive operations
    pub environment: Environment,
    /// Size and count limits on inputs
    pub limits: LimitsConfig,
    /// Ranking and highlighting parameters
    pub search: SearchConfig,
    /// Fact chain parameters
    pub facts: FactsConfig,
}

/// Input limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum length of any identifier, in bytes
    pub max_id_bytes: usize,
    /// Maximum memory / fact content, in bytes
    pub max_content_bytes: usize,
    /// Maximum conversation message content, in bytes
    pub max_message_bytes: usize,
    /// Maximum encoded size of a JSON payload, in bytes
    pub max_payload_bytes: usize,
    /// Maximum embedding dimensions
    pub max_embedding_dimensions: usize,
    /// Maximum tags per record
    pub max_tags: usize,
    /// Maximum operations in a mutable transaction
    pub max_batch_ops: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_id_bytes: 256,
            max_content_bytes: 256 * 1024,
            max_message_bytes: 256 * 1024,
            max_payload_bytes: 1024 * 1024,
            max_embedding_dimensions: 4096,
            max_tags: 64,
            max_batch_ops: 256,
        }
    }
}

/// Search ranking parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Multiplier for memories authored by a user
    pub user_role_boost: f64,
    /// Multiplier for memories whose fact category matches the query's
    pub category_boost: f64,
    /// Multiplier for memories carrying enriched content
    pub enrichment_boost: f64,
    /// Additive boost for conversations whose metadata matches
    pub metadata_boost: f64,
    /// Result limit when the caller gives none
    pub default_limit: usize,
    /// Characters of context on each side of a highlight
    pub highlight_radius: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            user_role_boost: 1.2,
            category_boost: 1.3,
            enrichment_boost: 1.1,
            metadata_boost: 0.1,
            default_limit: 20,
            highlight_radius: 30,
        }
    }
}

/// Fact store parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactsConfig {
    /// Longest supersession chain a history walk will follow
    pub max_chain_length: usize,
}

impl Default for FactsConfig {
    fn default() -> Self {
        Self {
            max_chain_length: 10_000,
        }
    }
}

impl CortexConfig {
    /// Default configuration for a given environment
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> CortexResult<Self> {
        let config: CortexConfig = toml::from_str(text)
            .map_err(|e| CortexError::invalid_input(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> CortexResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CortexError::invalid_input(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> CortexResult<String> {
        toml::to_string(self).map_err(|e| CortexError::serialization(e.to_string()))
    }

    /// Check every field is in range
    pub fn validate(&self) -> CortexResult<()> {
        let l = &self.limits;
        for (name, value) in [
            ("limits.max_id_bytes", l.max_id_bytes),
            ("limits.max_content_bytes", l.max_content_bytes),
            ("limits.max_message_bytes", l.max_message_bytes),
            ("limits.max_payload_bytes", l.max_payload_bytes),
            ("limits.max_embedding_dimensions", l.max_embedding_dimensions),
            ("limits.max_batch_ops", l.max_batch_ops),
            ("search.default_limit", self.search.default_limit),
            ("facts.max_chain_length", self.facts.max_chain_length),
        ] {
            if value == 0 {
                return Err(CortexError::invalid_input(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }

        let s = &self.search;
        for (name, value) in [
            ("search.user_role_boost", s.user_role_boost),
            ("search.category_boost", s.category_boost),
            ("search.enrichment_boost", s.enrichment_boost),
            ("search.metadata_boost", s.metadata_boost),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CortexError::invalid_input(format!(
                    "{} must be a non-negative finite number",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::ErrorCode;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = CortexConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.search.highlight_radius, 30);
        assert_eq!(config.search.user_role_boost, 1.2);
    }

    #[test]
    fn test_partial_toml() {
        let config = CortexConfig::from_toml_str(
            r#"
            environment = "test"

            [search]
            default_limit = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.search.default_limit, 5);
        assert_eq!(config.search.category_boost, 1.3);
        assert_eq!(config.limits, LimitsConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = CortexConfig::from_toml_str("[search]\ndefault_limit = 0\n").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = CortexConfig::from_toml_str("[search]\ncategory_boost = -1.0\n").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = CortexConfig::from_toml_str("environment = \"qa\"\n").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        let config = CortexConfig::for_environment(Environment::Dev);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();

        let loaded = CortexConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CortexConfig::load(dir.path().join("nope.toml")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}
