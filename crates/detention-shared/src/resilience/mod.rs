//! # Resilience
//!
//! Failure-isolation primitives shared by every downstream dependency:
//!
//! - [`CircuitBreaker`]: per-dependency failure gate
//! - [`CircuitBreakerBehavior`]: uniform trait over breaker wrappers
//! - [`CircuitBreakerMetrics`]: observability snapshots
//! - [`RetryPolicy`]: pure exponential-backoff bookkeeping

pub mod backoff;
pub mod behavior;
pub mod circuit_breaker;
pub mod metrics;


use std::time::Duration;

pub use backoff::{RetryDecision, RetryPolicy};
pub use behavior::CircuitBreakerBehavior;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use metrics::CircuitBreakerMetrics;

/// Runtime configuration for a single circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before admitting a probe
    pub timeout: Duration,
    /// Consecutive half-open successes needed to close
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}
