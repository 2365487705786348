use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use detention_shared::interfaces::CredentialProvider;
use detention_shared::{DetentionError, DetentionResult};

use super::lock;

/// Issues `token-1`, `token-2`, ... one per refresh call
#[derive(Debug, Default)]
pub struct FakeCredentialProvider {
    delay: Duration,
    calls: AtomicU64,
    ambient: Mutex<Option<String>>,
    failures: Mutex<VecDeque<DetentionError>>,
}

impl FakeCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each refresh takes `delay` before answering
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn refresh_calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_ambient(&self, token: Option<String>) {
        *lock(&self.ambient) = token;
    }

    /// The next refresh fails with `error`
    pub fn fail_next(&self, error: DetentionError) {
        lock(&self.failures).push_back(error);
    }
}

#[async_trait]
impl CredentialProvider for FakeCredentialProvider {
    fn ambient_token(&self) -> Option<String> {
        lock(&self.ambient).clone()
    }

    async fn refresh(&self) -> DetentionResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }
        Ok(format!("token-{call}"))
    }
}
