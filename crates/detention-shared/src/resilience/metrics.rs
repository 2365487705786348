//! Point-in-time counters for one breaker, logged at the end of every batch
//! run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resilience::CircuitState;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    /// Calls that reached the dependency
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    /// Calls refused locally while open
    pub rejected: u64,
    pub consecutive_failures: u32,
    pub half_open_successes: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub average_duration: Duration,
}

impl CircuitBreakerMetrics {
    /// Share of attempted calls that failed; zero before the first call
    pub fn failure_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.failures as f64 / self.calls as f64
        }
    }

    /// Closed and no locally refused calls since start
    pub fn is_clean(&self) -> bool {
        self.state == CircuitState::Closed && self.rejected == 0
    }

    pub fn format_summary(&self) -> String {
        let mut summary = format!(
            "{} | calls {} | failures {} ({:.0}%) | rejected {} | avg {}ms",
            self.state,
            self.calls,
            self.failures,
            self.failure_rate() * 100.0,
            self.rejected,
            self.average_duration.as_millis()
        );
        if let Some(at) = self.next_retry_at {
            summary.push_str(&format!(" | retry after {}", at.format("%H:%M:%S")));
        }
        summary
    }
}
