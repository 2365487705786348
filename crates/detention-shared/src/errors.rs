//! # Detention Error Types
//!
//! Unified error taxonomy for the adjudication engine. Every downstream
//! failure, business-rule rejection and engine-state violation is expressed as
//! a [`DetentionError`] so the orchestrator can decide, per error, whether to
//! retry, record a terminal failure, or invalidate the shared credential.
//!
//! The type is `Clone` because a single outcome is fanned out to every waiter
//! of a deduplicated or single-flight call.

use std::time::Duration;
use thiserror::Error;

/// Engine operation result type
pub type DetentionResult<T> = Result<T, DetentionError>;

/// Coarse error classification used for retry policy and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ErrorKind {
    #[display("network")]
    Network,
    #[display("timeout")]
    Timeout,
    #[display("rate_limit")]
    RateLimit,
    #[display("authentication")]
    Authentication,
    #[display("parse")]
    Parse,
    #[display("validation")]
    Validation,
    #[display("business_rule")]
    BusinessRule,
    #[display("circuit_open")]
    CircuitOpen,
    #[display("state")]
    State,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DetentionError {
    #[error("Network error during {operation}: {message}")]
    Network { operation: String, message: String },

    #[error("Timeout waiting for operation: {operation}")]
    Timeout { operation: String },

    #[error("Rate limited during {operation}")]
    RateLimited {
        operation: String,
        retry_after: Option<Duration>,
    },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No billing rules configured for shipper '{shipper}'")]
    MissingBillingRules { shipper: String },

    #[error("Version conflict on order {order_id}: expected version {expected}")]
    VersionConflict { order_id: String, expected: u64 },

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Circuit breaker open for dependency '{dependency}'")]
    CircuitOpen { dependency: String },

    #[error("Invalid engine state: {0}")]
    State(String),

    #[error("Batch cancelled")]
    Cancelled,
}

impl DetentionError {
    /// Create a network error for the given downstream operation
    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a rate-limit error, optionally carrying a server-requested delay
    pub fn rate_limited(operation: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            operation: operation.into(),
            retry_after,
        }
    }

    /// Create a parse error
    pub fn parse(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a version conflict error
    pub fn version_conflict(order_id: impl Into<String>, expected: u64) -> Self {
        Self::VersionConflict {
            order_id: order_id.into(),
            expected,
        }
    }

    /// Create a circuit-open error for a dependency
    pub fn circuit_open(dependency: impl Into<String>) -> Self {
        Self::CircuitOpen {
            dependency: dependency.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Validation(_) => ErrorKind::Validation,
            Self::MissingBillingRules { .. }
            | Self::VersionConflict { .. }
            | Self::BusinessRule(_) => ErrorKind::BusinessRule,
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Self::State(_) | Self::Cancelled => ErrorKind::State,
        }
    }

    /// Check if the whole call is worth retrying with backoff.
    ///
    /// Version conflicts are retryable too, but only through the write path's
    /// single re-fetch, never through the pipeline-level backoff loop.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::RateLimit
        )
    }

    /// Check if the error says something about the health of the dependency
    /// (as opposed to the request). Only these count against a circuit breaker.
    #[must_use]
    pub fn is_infrastructure_failure(&self) -> bool {
        self.is_retryable()
    }

    /// Server-requested delay carried by a rate-limit signal
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DetentionError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse("json", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors_are_retryable() {
        let err = DetentionError::network("fetch_order", "connection reset");
        assert!(err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn test_timeout_and_rate_limit_are_retryable() {
        assert!(DetentionError::timeout("fetch_timestamps").is_retryable());
        assert!(DetentionError::rate_limited("update_order", None).is_retryable());
    }

    #[test]
    fn test_business_errors_are_terminal() {
        let missing = DetentionError::MissingBillingRules {
            shipper: "ACME".to_string(),
        };
        assert!(!missing.is_retryable());
        assert_eq!(missing.kind(), ErrorKind::BusinessRule);

        let conflict = DetentionError::version_conflict("ORD-1", 4);
        assert!(!conflict.is_retryable());
        assert_eq!(conflict.kind(), ErrorKind::BusinessRule);

        assert!(!DetentionError::validation("bad id").is_retryable());
    }

    #[test]
    fn test_auth_and_circuit_open_are_not_retried() {
        assert!(!DetentionError::Authentication("expired".to_string()).is_retryable());
        let open = DetentionError::circuit_open("order_facts");
        assert!(!open.is_retryable());
        assert!(!open.is_infrastructure_failure());
        assert_eq!(open.kind(), ErrorKind::CircuitOpen);
    }

    #[test]
    fn test_retry_after_only_on_rate_limit() {
        let err = DetentionError::rate_limited("fetch_order", Some(Duration::from_secs(7)));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(DetentionError::timeout("x").retry_after(), None);
    }

    #[test]
    fn test_display_messages() {
        let err = DetentionError::MissingBillingRules {
            shipper: "Globex".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "No billing rules configured for shipper 'Globex'"
        );
        assert_eq!(
            format!("{}", DetentionError::circuit_open("timestamps")),
            "Circuit breaker open for dependency 'timestamps'"
        );
        assert_eq!(format!("{}", ErrorKind::RateLimit), "rate_limit");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{{bad}}").unwrap_err();
        let err: DetentionError = json_err.into();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
