//! Batch dispatch and retry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::RetryPolicy;

/// Chunking and parallelism for a batch run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Orders per chunk; a checkpoint is written after each chunk
    pub chunk_size: usize,
    /// Orders in flight at once within a chunk
    pub parallel_group_size: usize,
    /// Pause between consecutive chunks
    pub inter_chunk_cooldown_ms: u64,
    /// Largest identifier list a single run accepts
    pub max_orders_per_session: usize,
    /// Poll interval while a run is paused
    pub pause_poll_interval_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            parallel_group_size: 5,
            inter_chunk_cooldown_ms: 2000,
            max_orders_per_session: 5000,
            pause_poll_interval_ms: 500,
        }
    }
}

impl BatchConfig {
    pub fn inter_chunk_cooldown(&self) -> Duration {
        Duration::from_millis(self.inter_chunk_cooldown_ms)
    }

    pub fn pause_poll_interval(&self) -> Duration {
        Duration::from_millis(self.pause_poll_interval_ms)
    }
}

/// Retry/backoff settings for retryable downstream failures
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub rate_limit_multiplier: f64,
    pub rate_limit_cooldown_ms: u64,
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            multiplier: policy.multiplier,
            rate_limit_multiplier: policy.rate_limit_multiplier,
            rate_limit_cooldown_ms: policy.rate_limit_cooldown.as_millis() as u64,
            jitter_ratio: policy.jitter_ratio,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            rate_limit_multiplier: self.rate_limit_multiplier,
            rate_limit_cooldown: Duration::from_millis(self.rate_limit_cooldown_ms),
            jitter_ratio: self.jitter_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_round_trips_default_policy() {
        assert_eq!(RetryConfig::default().to_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_batch_durations() {
        let config = BatchConfig {
            inter_chunk_cooldown_ms: 1500,
            ..BatchConfig::default()
        };
        assert_eq!(config.inter_chunk_cooldown(), Duration::from_millis(1500));
    }
}
