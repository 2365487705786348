//! Object-safe view of a breaker, used where the three dependency breakers
//! are handled as one set.

use std::time::Duration;

use crate::resilience::{CircuitBreakerMetrics, CircuitState};

pub trait CircuitBreakerBehavior: Send + Sync + std::fmt::Debug {
    /// Dependency this breaker guards
    fn name(&self) -> &str;

    fn state(&self) -> CircuitState;

    /// Whether a call may proceed now. An open breaker whose cooldown has
    /// elapsed moves to half-open and admits the call.
    fn should_allow(&self) -> bool;

    fn record_success(&self, duration: Duration);

    fn record_failure(&self, duration: Duration);

    fn is_healthy(&self) -> bool;

    fn force_open(&self);

    fn force_closed(&self);

    fn metrics(&self) -> CircuitBreakerMetrics;
}
