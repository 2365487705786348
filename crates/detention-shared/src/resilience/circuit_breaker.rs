//! # Generic Circuit Breaker
//!
//! Failure gate for a single downstream dependency.
//!
//! ```text
//! Closed --(failure_threshold consecutive failures)--> Open
//! Open --(timeout elapsed, next call)--> HalfOpen
//! HalfOpen --(success_threshold consecutive successes)--> Closed
//! HalfOpen --(any failure)--> Open (fresh cooldown)
//! ```
//!
//! Only failures that say something about the dependency's health (network,
//! timeout, rate-limit) are counted; a request the dependency rejected on its
//! merits still proves the dependency is up.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{DetentionError, DetentionResult};
use crate::resilience::{CircuitBreakerBehavior, CircuitBreakerConfig, CircuitBreakerMetrics};

/// Circuit state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Closed,
            2 => Self::HalfOpen,
            // Unknown values are treated as Open (safest)
            _ => Self::Open,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
    next_retry_at: Option<DateTime<Utc>>,
    total_calls: u64,
    success_count: u64,
    failure_count: u64,
    rejected_count: u64,
    total_duration: Duration,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            half_open_successes: 0,
            opened_at: None,
            next_retry_at: None,
            total_calls: 0,
            success_count: 0,
            failure_count: 0,
            rejected_count: 0,
            total_duration: Duration::ZERO,
        }
    }
}

/// Circuit breaker protecting one dependency
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            inner: Mutex::new(BreakerInner::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Check if the next call may proceed, moving Open → HalfOpen once the
    /// recovery timeout has elapsed.
    pub fn should_allow(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|opened| opened.elapsed() >= self.config.timeout)
                    .unwrap_or(true);
                if elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    inner.next_retry_at = None;
                    info!(circuit_breaker = %self.name, "Circuit breaker moving to half-open");
                    true
                } else {
                    inner.rejected_count += 1;
                    false
                }
            }
        }
    }

    pub fn record_success_manual(&self, duration: Duration) {
        let mut inner = self.lock();
        inner.total_calls += 1;
        inner.success_count += 1;
        inner.total_duration += duration;

        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.half_open_successes = 0;
                    inner.opened_at = None;
                    info!(circuit_breaker = %self.name, "Circuit breaker recovered to closed");
                }
            }
            // Late result of a call admitted before the circuit opened
            CircuitState::Open => {}
        }
    }

    pub fn record_failure_manual(&self, duration: Duration) {
        let mut inner = self.lock();
        inner.total_calls += 1;
        inner.failure_count += 1;
        inner.total_duration += duration;
        inner.consecutive_failures += 1;

        match inner.state {
            CircuitState::Closed => {
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.trip(&mut inner);
                }
            }
            CircuitState::HalfOpen => self.trip(&mut inner),
            CircuitState::Open => {}
        }
    }

    fn trip(&self, inner: &mut BreakerInner) {
        let next_retry = chrono::Duration::from_std(self.config.timeout)
            .ok()
            .and_then(|timeout| Utc::now().checked_add_signed(timeout));
        inner.state = CircuitState::Open;
        inner.half_open_successes = 0;
        inner.opened_at = Some(Instant::now());
        inner.next_retry_at = next_retry;
        warn!(
            circuit_breaker = %self.name,
            consecutive_failures = inner.consecutive_failures,
            next_retry_at = ?next_retry,
            "Circuit breaker tripped to open"
        );
    }

    /// Run `operation` through the breaker.
    ///
    /// Rejected calls return [`DetentionError::CircuitOpen`] without invoking
    /// `operation`.
    pub async fn call<F, Fut, T>(&self, operation: F) -> DetentionResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DetentionResult<T>>,
    {
        if !self.should_allow() {
            debug!(circuit_breaker = %self.name, "Rejecting call, circuit open");
            return Err(DetentionError::circuit_open(self.name.clone()));
        }

        let started = Instant::now();
        let result = operation().await;
        let elapsed = started.elapsed();

        match &result {
            Err(err) if err.is_infrastructure_failure() => self.record_failure_manual(elapsed),
            _ => self.record_success_manual(elapsed),
        }
        result
    }

    pub fn is_healthy(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    pub fn force_open(&self) {
        let mut inner = self.lock();
        self.trip(&mut inner);
    }

    pub fn force_closed(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.half_open_successes = 0;
        inner.opened_at = None;
        inner.next_retry_at = None;
        info!(circuit_breaker = %self.name, "Circuit breaker forced closed");
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.lock();
        let average_duration = u32::try_from(inner.total_calls)
            .ok()
            .filter(|calls| *calls > 0)
            .map(|calls| inner.total_duration / calls)
            .unwrap_or_default();

        CircuitBreakerMetrics {
            state: inner.state,
            calls: inner.total_calls,
            successes: inner.success_count,
            failures: inner.failure_count,
            rejected: inner.rejected_count,
            consecutive_failures: inner.consecutive_failures,
            half_open_successes: inner.half_open_successes,
            next_retry_at: inner.next_retry_at,
            average_duration,
        }
    }
}

impl CircuitBreakerBehavior for CircuitBreaker {
    fn name(&self) -> &str {
        CircuitBreaker::name(self)
    }

    fn state(&self) -> CircuitState {
        CircuitBreaker::state(self)
    }

    fn should_allow(&self) -> bool {
        CircuitBreaker::should_allow(self)
    }

    fn record_success(&self, duration: Duration) {
        self.record_success_manual(duration);
    }

    fn record_failure(&self, duration: Duration) {
        self.record_failure_manual(duration);
    }

    fn is_healthy(&self) -> bool {
        CircuitBreaker::is_healthy(self)
    }

    fn force_open(&self) {
        CircuitBreaker::force_open(self);
    }

    fn force_closed(&self) {
        CircuitBreaker::force_closed(self);
    }

    fn metrics(&self) -> CircuitBreakerMetrics {
        CircuitBreaker::metrics(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, timeout: Duration, success_threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test".to_string(),
            CircuitBreakerConfig {
                failure_threshold,
                timeout,
                success_threshold,
            },
        )
    }

    #[test]
    fn test_starts_closed() {
        let cb = breaker(3, Duration::from_secs(5), 2);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.should_allow());
        assert!(cb.is_healthy());
    }

    #[test]
    fn test_opens_at_exact_threshold() {
        let cb = breaker(5, Duration::from_secs(30), 2);

        for i in 1..5 {
            cb.record_failure_manual(Duration::ZERO);
            assert!(
                cb.should_allow(),
                "Circuit should be closed at {} failures (threshold is 5)",
                i
            );
        }

        cb.record_failure_manual(Duration::ZERO);
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.should_allow());
        assert!(cb.metrics().next_retry_at.is_some());
    }

    #[test]
    fn test_open_rejects_until_cooldown() {
        let cb = breaker(1, Duration::from_secs(60), 1);
        cb.record_failure_manual(Duration::ZERO);

        for _ in 0..10 {
            assert!(!cb.should_allow());
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.metrics().rejected, 10);
    }

    #[test]
    fn test_half_open_closes_after_success_threshold() {
        let cb = breaker(2, Duration::ZERO, 2);
        cb.record_failure_manual(Duration::ZERO);
        cb.record_failure_manual(Duration::ZERO);
        assert_eq!(cb.state(), CircuitState::Open);

        // Zero timeout: next check moves straight to half-open
        assert!(cb.should_allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_success_manual(Duration::ZERO);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success_manual(Duration::ZERO);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.metrics().consecutive_failures, 0);
    }

    #[test]
    fn test_failure_in_half_open_reopens() {
        let cb = breaker(1, Duration::ZERO, 3);
        cb.record_failure_manual(Duration::ZERO);
        assert!(cb.should_allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_success_manual(Duration::ZERO);
        cb.record_failure_manual(Duration::ZERO);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = breaker(10, Duration::from_secs(30), 1);
        cb.record_failure_manual(Duration::ZERO);
        cb.record_failure_manual(Duration::ZERO);
        assert_eq!(cb.metrics().consecutive_failures, 2);

        cb.record_success_manual(Duration::ZERO);
        assert_eq!(cb.metrics().consecutive_failures, 0);
    }

    #[test]
    fn test_force_operations() {
        let cb = breaker(5, Duration::from_secs(30), 2);
        cb.force_open();
        assert_eq!(cb.state(), CircuitState::Open);
        cb.force_closed();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_circuit_state_from_u8_conversion() {
        assert_eq!(CircuitState::from(0), CircuitState::Closed);
        assert_eq!(CircuitState::from(1), CircuitState::Open);
        assert_eq!(CircuitState::from(2), CircuitState::HalfOpen);
        assert_eq!(CircuitState::from(255), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_call_rejects_without_invoking_when_open() {
        let cb = breaker(1, Duration::from_secs(60), 1);
        cb.force_open();

        let mut invoked = false;
        let result: DetentionResult<()> = cb
            .call(|| {
                invoked = true;
                async { Ok(()) }
            })
            .await;

        assert!(!invoked);
        assert!(matches!(result, Err(DetentionError::CircuitOpen { .. })));
    }

    #[tokio::test]
    async fn test_call_counts_only_infrastructure_failures() {
        let cb = breaker(2, Duration::from_secs(60), 1);

        for _ in 0..3 {
            let _ = cb
                .call(|| async { Err::<(), _>(DetentionError::validation("bad order id")) })
                .await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);

        for _ in 0..2 {
            let _ = cb
                .call(|| async { Err::<(), _>(DetentionError::timeout("fetch_order")) })
                .await;
        }
        assert_eq!(cb.state(), CircuitState::Open);
    }
}
