//! Retry scheduling on top of the pure [`RetryPolicy`] decisions.

use std::future::Future;

use tracing::{debug, warn};

use detention_shared::resilience::{RetryDecision, RetryPolicy};
use detention_shared::DetentionResult;

/// Run `attempt` until it succeeds or the policy gives up.
///
/// `attempt` receives the 1-based attempt number. Non-retryable errors are
/// returned immediately.
pub async fn retry_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut attempt: F,
) -> DetentionResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = DetentionResult<T>>,
{
    let mut attempt_number = 1;
    loop {
        let error = match attempt(attempt_number).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        match policy.decide(attempt_number, &error) {
            RetryDecision::Retry {
                next_attempt,
                delay,
            } => {
                let delay = policy.jittered(delay);
                warn!(
                    operation,
                    attempt = attempt_number,
                    error_kind = %error.kind(),
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retryable failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt_number = next_attempt;
            }
            RetryDecision::GiveUp { attempts } => {
                debug!(operation, attempts, error = %error, "Giving up");
                return Err(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detention_shared::DetentionError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            jitter_ratio: 0.0,
            ..RetryPolicy::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = retry_with_policy(&policy(), "lookup", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(DetentionError::network("lookup", "connection reset"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms then 200ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_at_ceiling() {
        let calls = AtomicU32::new(0);
        let result: DetentionResult<()> = retry_with_policy(&policy(), "lookup", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DetentionError::timeout("lookup")) }
        })
        .await;

        assert!(matches!(result, Err(DetentionError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: DetentionResult<()> = retry_with_policy(&policy(), "write", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DetentionError::Validation("bad line".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_adds_cooldown() {
        let started = tokio::time::Instant::now();
        let calls = AtomicU32::new(0);
        let result = retry_with_policy(&policy(), "lookup", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 1 {
                    Err(DetentionError::rate_limited("lookup", None))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        // 100ms x 2.0 penalty + 10s default cooldown
        assert!(started.elapsed() >= Duration::from_millis(10_200));
    }
}
