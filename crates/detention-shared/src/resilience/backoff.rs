//! # Retry Backoff
//!
//! Pure retry bookkeeping: given how many attempts have been made and the
//! error the last one produced, decide whether to try again and how long to
//! wait first. No clocks, no sleeping; the scheduling layer consumes the
//! [`RetryDecision`] and performs the wait.

use std::time::Duration;

use crate::errors::{DetentionError, ErrorKind};

/// Exponential backoff policy with a rate-limit penalty
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for the exponential component
    pub max_delay: Duration,
    /// Growth factor between consecutive retries
    pub multiplier: f64,
    /// Extra factor applied to the exponential component on rate-limit signals
    pub rate_limit_multiplier: f64,
    /// Cooldown added on top of the backoff when rate limited
    pub rate_limit_cooldown: Duration,
    /// Fraction of the delay randomized by [`RetryPolicy::jittered`] (0.0 disables)
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            rate_limit_multiplier: 2.0,
            rate_limit_cooldown: Duration::from_secs(10),
            jitter_ratio: 0.1,
        }
    }
}

/// Outcome of consulting the policy after a failed attempt
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Wait `delay`, then make attempt number `next_attempt`
    Retry { next_attempt: u32, delay: Duration },
    /// Record the failure; `attempts` were made
    GiveUp { attempts: u32 },
}

impl RetryPolicy {
    /// Exponential component for the retry following attempt `attempt` (1-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let millis = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Decide what to do after `attempts_made` attempts ended in `error`
    pub fn decide(&self, attempts_made: u32, error: &DetentionError) -> RetryDecision {
        if !error.is_retryable() || attempts_made >= self.max_attempts {
            return RetryDecision::GiveUp {
                attempts: attempts_made,
            };
        }

        let backoff = self.backoff_delay(attempts_made);
        let delay = if error.kind() == ErrorKind::RateLimit {
            let penalized = Duration::from_millis(
                (backoff.as_millis() as f64 * self.rate_limit_multiplier).max(0.0) as u64,
            );
            let cooldown = error
                .retry_after()
                .map_or(self.rate_limit_cooldown, |server| {
                    server.max(self.rate_limit_cooldown)
                });
            penalized + cooldown
        } else {
            backoff
        };

        RetryDecision::Retry {
            next_attempt: attempts_made + 1,
            delay,
        }
    }

    /// Spread `delay` by up to ±`jitter_ratio` so parallel orders do not retry in lockstep
    pub fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter_ratio <= 0.0 || delay.is_zero() {
            return delay;
        }
        let spread = delay.as_millis() as f64 * self.jitter_ratio;
        let offset = (fastrand::f64() * 2.0 - 1.0) * spread;
        Duration::from_millis((delay.as_millis() as f64 + offset).max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            multiplier: 2.0,
            rate_limit_multiplier: 3.0,
            rate_limit_cooldown: Duration::from_millis(500),
            jitter_ratio: 0.0,
        }
    }

    #[test]
    fn test_backoff_grows_exponentially_and_caps() {
        let p = policy();
        assert_eq!(p.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(p.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(p.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(p.backoff_delay(5), Duration::from_millis(1000));
        assert_eq!(p.backoff_delay(60), Duration::from_millis(1000));
    }

    #[test]
    fn test_retryable_error_retries_until_ceiling() {
        let p = policy();
        let err = DetentionError::network("fetch_order", "reset");

        assert_eq!(
            p.decide(1, &err),
            RetryDecision::Retry {
                next_attempt: 2,
                delay: Duration::from_millis(100)
            }
        );
        assert_eq!(
            p.decide(3, &err),
            RetryDecision::Retry {
                next_attempt: 4,
                delay: Duration::from_millis(400)
            }
        );
        assert_eq!(p.decide(4, &err), RetryDecision::GiveUp { attempts: 4 });
    }

    #[test]
    fn test_terminal_error_gives_up_immediately() {
        let p = policy();
        let err = DetentionError::MissingBillingRules {
            shipper: "ACME".to_string(),
        };
        assert_eq!(p.decide(1, &err), RetryDecision::GiveUp { attempts: 1 });
        assert_eq!(
            p.decide(1, &DetentionError::circuit_open("timestamps")),
            RetryDecision::GiveUp { attempts: 1 }
        );
    }

    #[test]
    fn test_rate_limit_adds_multiplier_and_cooldown() {
        let p = policy();
        let err = DetentionError::rate_limited("update_order", None);
        // 100ms * 3 + 500ms cooldown
        assert_eq!(
            p.decide(1, &err),
            RetryDecision::Retry {
                next_attempt: 2,
                delay: Duration::from_millis(800)
            }
        );
    }

    #[test]
    fn test_rate_limit_honors_longer_server_delay() {
        let p = policy();
        let err = DetentionError::rate_limited("update_order", Some(Duration::from_secs(2)));
        assert_eq!(
            p.decide(1, &err),
            RetryDecision::Retry {
                next_attempt: 2,
                delay: Duration::from_millis(2300)
            }
        );
    }

    #[test]
    fn test_jitter_stays_within_ratio() {
        let p = RetryPolicy {
            jitter_ratio: 0.2,
            ..policy()
        };
        for _ in 0..100 {
            let d = p.jittered(Duration::from_millis(1000));
            assert!(d >= Duration::from_millis(800) && d <= Duration::from_millis(1200));
        }
        assert_eq!(policy().jittered(Duration::from_millis(1000)), Duration::from_millis(1000));
    }
}
