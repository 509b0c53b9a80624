//! Guard configuration
//!
//! Settings a [`Database`](crate::Database) is constructed with. They can be
//! built in code, deserialized with serde, or read from the environment:
//!
//! | Variable                          | Values                          | Default |
//! |-----------------------------------|---------------------------------|---------|
//! | `SQLGUARD_ENFORCEMENT`            | `permissive`, `warn`, `strict`  | `warn`  |
//! | `SQLGUARD_DIALECT`                | `mysql`, `postgresql`, `sqlite` | `mysql` |
//! | `SQLGUARD_MAX_IDENTIFIER_LENGTH`  | positive integer                | unset   |

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backends::SqlDialect;
use crate::policy::EnforcementLevel;

/// Configuration loading and validation
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    EnvVar(String),
    Default(String),
}

/// Settings for guarded query construction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Reaction to non-literal SQL text
    pub enforcement: EnforcementLevel,
    /// Identifier quoting and parameter marker style
    pub dialect: SqlDialect,
    /// Longest alias value accepted, in characters
    pub max_identifier_length: Option<usize>,
}

impl GuardConfig {
    pub fn with_enforcement(mut self, enforcement: EnforcementLevel) -> Self {
        self.enforcement = enforcement;
        self
    }

    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_max_identifier_length(mut self, max_identifier_length: Option<usize>) -> Self {
        self.max_identifier_length = max_identifier_length;
        self
    }
}

impl ConfigLoader for GuardConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let enforcement = get_env_or_default("SQLGUARD_ENFORCEMENT", "warn");
        let enforcement = enforcement
            .parse::<EnforcementLevel>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "enforcement".to_string(),
                value: enforcement,
                expected: "permissive, warn, or strict".to_string(),
            })?;

        let dialect = get_env_or_default("SQLGUARD_DIALECT", "mysql");
        let dialect = dialect
            .parse::<SqlDialect>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "dialect".to_string(),
                value: dialect,
                expected: "mysql, postgresql, or sqlite".to_string(),
            })?;

        let max_identifier_length = match get_env_optional("SQLGUARD_MAX_IDENTIFIER_LENGTH") {
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                field: "max_identifier_length".to_string(),
                value: raw,
                expected: "positive integer".to_string(),
            })?),
            None => None,
        };

        let config = GuardConfig {
            enforcement,
            dialect,
            max_identifier_length,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_identifier_length == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "max_identifier_length".to_string(),
                reason: "Maximum identifier length cannot be 0".to_string(),
            });
        }

        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        sources.insert(
            "enforcement".to_string(),
            env_or_default_source("SQLGUARD_ENFORCEMENT", "warn"),
        );
        sources.insert(
            "dialect".to_string(),
            env_or_default_source("SQLGUARD_DIALECT", "mysql"),
        );
        sources.insert(
            "max_identifier_length".to_string(),
            env_or_default_source("SQLGUARD_MAX_IDENTIFIER_LENGTH", "none"),
        );
        sources
    }
}

// Helper functions for environment variable handling
fn get_env_optional(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_default_source(key: &str, default: &str) -> ConfigSource {
    if env::var_os(key).is_some() {
        ConfigSource::EnvVar(key.to_string())
    } else {
        ConfigSource::Default(default.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: '{value}', expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Validation failed for {field}: {reason}")]
    ValidationFailed { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 3] = [
        "SQLGUARD_ENFORCEMENT",
        "SQLGUARD_DIALECT",
        "SQLGUARD_MAX_IDENTIFIER_LENGTH",
    ];

    fn clean_test_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clean_test_env();

        let config = GuardConfig::from_env().unwrap();
        assert_eq!(config, GuardConfig::default());
        assert_eq!(config.enforcement, EnforcementLevel::Warn);
        assert_eq!(config.dialect, SqlDialect::MySQL);
        assert_eq!(config.max_identifier_length, None);

        let sources = config.config_sources();
        assert_eq!(sources["dialect"], ConfigSource::Default("mysql".to_string()));
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        clean_test_env();
        env::set_var("SQLGUARD_ENFORCEMENT", "strict");
        env::set_var("SQLGUARD_DIALECT", "postgres");
        env::set_var("SQLGUARD_MAX_IDENTIFIER_LENGTH", "63");

        let config = GuardConfig::from_env().unwrap();
        assert_eq!(config.enforcement, EnforcementLevel::Strict);
        assert_eq!(config.dialect, SqlDialect::PostgreSQL);
        assert_eq!(config.max_identifier_length, Some(63));
        assert_eq!(
            config.config_sources()["enforcement"],
            ConfigSource::EnvVar("SQLGUARD_ENFORCEMENT".to_string())
        );

        clean_test_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_values() {
        clean_test_env();

        env::set_var("SQLGUARD_ENFORCEMENT", "loud");
        assert!(matches!(
            GuardConfig::from_env(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "enforcement"
        ));
        clean_test_env();

        env::set_var("SQLGUARD_DIALECT", "oracle");
        assert!(GuardConfig::from_env().is_err());
        clean_test_env();

        env::set_var("SQLGUARD_MAX_IDENTIFIER_LENGTH", "0");
        assert!(matches!(
            GuardConfig::from_env(),
            Err(ConfigError::ValidationFailed { .. })
        ));
        clean_test_env();
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: GuardConfig = serde_json::from_str(r#"{"enforcement": "strict"}"#).unwrap();
        assert_eq!(config.enforcement, EnforcementLevel::Strict);
        assert_eq!(config.dialect, SqlDialect::MySQL);

        let config: GuardConfig =
            serde_json::from_str(r#"{"dialect": "sqlite", "max_identifier_length": 64}"#).unwrap();
        assert_eq!(config.dialect, SqlDialect::SQLite);
        assert_eq!(config.max_identifier_length, Some(64));
    }
}
