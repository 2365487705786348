//! # Engine Configuration
//!
//! Configuration for the adjudication engine. Every field has a default, so
//! an empty file (or no file at all) yields a runnable configuration.
//!
//! ## Structure
//!
//! ```text
//! config/
//! ├── mod.rs              # DetentionConfig, ConfigManager
//! ├── batch.rs            # BatchConfig, RetryConfig
//! ├── circuit_breaker.rs  # CircuitBreakerSettings
//! └── session.rs          # Credential/Approval/Checkpoint/Analyzer configs
//! ```
//!
//! ## Loading
//!
//! A TOML file (explicit path, or `DETENTION_CONFIG_PATH`) is layered under
//! environment overrides of the form `DETENTION__SECTION__FIELD`:
//!
//! ```bash
//! DETENTION__BATCH__CHUNK_SIZE=25 detention-ctl config validate
//! ```

pub mod batch;
pub mod circuit_breaker;
pub mod session;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use batch::{BatchConfig, RetryConfig};
pub use circuit_breaker::{
    CircuitBreakerComponentConfig, CircuitBreakerDefaultConfig, CircuitBreakerSettings,
    ComponentCircuitBreakerConfigs, ORDER_FACTS_COMPONENT, ORDER_MUTATION_COMPONENT,
    TIMESTAMPS_COMPONENT,
};
pub use session::{AnalyzerConfig, ApprovalConfig, CheckpointConfig, CredentialConfig};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "DETENTION_CONFIG_PATH";
const ENV_PREFIX: &str = "DETENTION";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigurationError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DetentionConfig {
    pub batch: BatchConfig,
    pub retry: RetryConfig,
    pub circuit_breakers: CircuitBreakerSettings,
    pub credentials: CredentialConfig,
    pub approval: ApprovalConfig,
    pub checkpoint: CheckpointConfig,
    pub analyzer: AnalyzerConfig,
}

impl DetentionConfig {
    /// Reject values that would stall or break a run
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.batch.chunk_size == 0 {
            return Err(ConfigurationError::invalid("batch.chunk_size", "must be at least 1"));
        }
        if self.batch.parallel_group_size == 0 {
            return Err(ConfigurationError::invalid(
                "batch.parallel_group_size",
                "must be at least 1",
            ));
        }
        if self.batch.max_orders_per_session == 0 {
            return Err(ConfigurationError::invalid(
                "batch.max_orders_per_session",
                "must be at least 1",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigurationError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigurationError::invalid("retry.multiplier", "must be >= 1.0"));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_ratio) {
            return Err(ConfigurationError::invalid(
                "retry.jitter_ratio",
                "must be between 0.0 and 1.0",
            ));
        }
        let defaults = &self.circuit_breakers.default_config;
        if defaults.failure_threshold == 0 || defaults.success_threshold == 0 {
            return Err(ConfigurationError::invalid(
                "circuit_breakers.default_config",
                "thresholds must be at least 1",
            ));
        }
        for component in [ORDER_FACTS_COMPONENT, TIMESTAMPS_COMPONENT, ORDER_MUTATION_COMPONENT] {
            let component_config = self.circuit_breakers.config_for_component(component);
            if component_config.failure_threshold == 0 || component_config.success_threshold == 0 {
                return Err(ConfigurationError::invalid(
                    format!("circuit_breakers.component_configs.{component}"),
                    "thresholds must be at least 1",
                ));
            }
        }
        if self.credentials.refresh_margin_seconds >= self.credentials.token_lifetime_seconds {
            return Err(ConfigurationError::invalid(
                "credentials.refresh_margin_seconds",
                "must be shorter than the token lifetime",
            ));
        }
        if self.checkpoint.key.trim().is_empty() {
            return Err(ConfigurationError::invalid("checkpoint.key", "must not be empty"));
        }
        Ok(())
    }
}

/// Loads [`DetentionConfig`] from file and environment
#[derive(Debug)]
pub struct ConfigManager;

impl ConfigManager {
    /// Load using `DETENTION_CONFIG_PATH` when set, otherwise defaults + environment
    pub fn load() -> Result<DetentionConfig, ConfigurationError> {
        let path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_layered(path.as_deref())
    }

    /// Load from an explicit file (required to exist), then apply environment overrides
    pub fn load_from_path(path: &Path) -> Result<DetentionConfig, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::NotFound(path.to_path_buf()));
        }
        Self::load_layered(Some(path))
    }

    fn load_layered(path: Option<&Path>) -> Result<DetentionConfig, ConfigurationError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading detention configuration file");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

        let detention: DetentionConfig = builder.build()?.try_deserialize()?;
        detention.validate()?;
        Ok(detention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = DetentionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch.chunk_size, 50);
        assert_eq!(config.batch.parallel_group_size, 5);
        assert_eq!(config.approval.timeout_seconds, 300);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut config = DetentionConfig::default();
        config.batch.chunk_size = 0;
        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("batch.chunk_size"));
    }

    #[test]
    fn test_zero_component_threshold_rejected() {
        let mut config = DetentionConfig::default();
        config.circuit_breakers.component_configs.order_mutation =
            Some(CircuitBreakerComponentConfig {
                failure_threshold: 0,
                success_threshold: 1,
            });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_refresh_margin_must_be_shorter_than_lifetime() {
        let mut config = DetentionConfig::default();
        config.credentials.refresh_margin_seconds = config.credentials.token_lifetime_seconds;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_path_with_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[batch]
chunk_size = 20
parallel_group_size = 4

[approval]
timeout_seconds = 90
"#
        )
        .unwrap();

        let config = ConfigManager::load_from_path(file.path()).unwrap();
        assert_eq!(config.batch.chunk_size, 20);
        assert_eq!(config.batch.parallel_group_size, 4);
        // Untouched sections keep defaults
        assert_eq!(config.batch.max_orders_per_session, 5000);
        assert_eq!(config.approval.timeout_seconds, 90);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[batch]\nchunk_size = 20\n").unwrap();

        std::env::set_var("DETENTION__BATCH__CHUNK_SIZE", "7");
        let result = ConfigManager::load_from_path(file.path());
        std::env::remove_var("DETENTION__BATCH__CHUNK_SIZE");

        assert_eq!(result.unwrap().batch.chunk_size, 7);
    }

    #[test]
    #[serial]
    fn test_missing_file_is_an_error() {
        let err = ConfigManager::load_from_path(Path::new("/nonexistent/detention.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::NotFound(_)));
    }

    #[test]
    #[serial]
    fn test_load_without_path_uses_defaults() {
        std::env::remove_var(CONFIG_PATH_ENV);
        let config = ConfigManager::load().unwrap();
        assert_eq!(config, DetentionConfig::default());
    }
}
