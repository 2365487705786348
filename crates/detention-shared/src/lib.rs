//! # Detention Shared
//!
//! Foundation types for the detention adjudication engine: the error
//! taxonomy, configuration, resilience primitives, domain models and the
//! collaborator traits the orchestration layer is written against.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod logging;
pub mod models;
pub mod resilience;

pub use config::{ConfigManager, ConfigurationError, DetentionConfig};
pub use errors::{DetentionError, DetentionResult, ErrorKind};
pub use interfaces::{
    BillingRulesSource, CredentialProvider, OrderFactsSource, OrderMutationSink,
    TimestampFactsSource,
};
