//! # Credential Manager
//!
//! Owns the single session credential every downstream call uses.
//!
//! `ensure()` walks three paths, cheapest first:
//!
//! 1. adopt a newer token already present in the ambient session context
//! 2. keep the held token while it is still fresh
//! 3. refresh over the network, single-flight: concurrent callers share the
//!    one in-flight refresh and all observe its outcome, success or failure

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use detention_shared::config::CredentialConfig;
use detention_shared::models::Credential;
use detention_shared::{CredentialProvider, DetentionResult};

type RefreshFuture = Shared<BoxFuture<'static, DetentionResult<Credential>>>;

#[derive(Debug)]
pub struct CredentialManager {
    provider: Arc<dyn CredentialProvider>,
    config: CredentialConfig,
    current: Arc<RwLock<Option<Credential>>>,
    /// Last token the server rejected; never re-adopted from ambient context
    rejected: Mutex<Option<String>>,
    in_flight: Mutex<Option<RefreshFuture>>,
    refresh_count: Arc<AtomicU64>,
}

impl CredentialManager {
    pub fn new(provider: Arc<dyn CredentialProvider>, config: CredentialConfig) -> Self {
        Self {
            provider,
            config,
            current: Arc::new(RwLock::new(None)),
            rejected: Mutex::new(None),
            in_flight: Mutex::new(None),
            refresh_count: Arc::new(AtomicU64::new(0)),
        }
    }

    fn lifetime(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.config.token_lifetime()).unwrap_or(chrono::Duration::zero())
    }

    fn held(&self) -> Option<Credential> {
        self.current.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn store(&self, credential: Option<Credential>) {
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = credential;
    }

    /// Token currently held, without any freshness check
    pub fn current_token(&self) -> Option<String> {
        self.held().map(|c| c.token)
    }

    /// Network refreshes performed so far
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    /// Valid credential, refreshing if the held one has expired
    pub async fn ensure(&self) -> DetentionResult<Credential> {
        self.ensure_fresh_for(Duration::ZERO).await
    }

    /// Valid credential with at least `margin` of remaining lifetime
    pub async fn ensure_fresh_for(&self, margin: Duration) -> DetentionResult<Credential> {
        let now = Utc::now();
        let margin = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::zero());
        let held = self.held();

        if let Some(ambient) = self.provider.ambient_token() {
            let is_new = held.as_ref().is_none_or(|c| c.token != ambient);
            let was_rejected = self
                .rejected
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .as_deref()
                == Some(ambient.as_str());
            if is_new && !was_rejected {
                debug!("Adopting session token from ambient context");
                let credential = Credential::new(ambient, now, self.lifetime());
                self.store(Some(credential.clone()));
                return Ok(credential);
            }
        }

        if let Some(credential) = held {
            if credential.is_fresh_for(now, margin) {
                return Ok(credential);
            }
            debug!(
                remaining_seconds = credential.remaining(now).num_seconds(),
                "Session token near expiry"
            );
        }

        self.shared_refresh().await
    }

    /// Drop the held credential so the next `ensure()` acquires a new one
    pub fn invalidate(&self) {
        warn!("Invalidating session credential");
        if let Some(rejected) = self.held() {
            *self.rejected.lock().unwrap_or_else(|p| p.into_inner()) = Some(rejected.token);
        }
        self.store(None);
    }

    fn shared_refresh(&self) -> RefreshFuture {
        let mut slot = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(existing) = slot.as_ref() {
            // A settled future is a previous refresh, not an in-flight one
            if existing.peek().is_none() {
                debug!("Joining in-flight credential refresh");
                return existing.clone();
            }
        }

        let provider = Arc::clone(&self.provider);
        let current = Arc::clone(&self.current);
        let counter = Arc::clone(&self.refresh_count);
        let lifetime = self.lifetime();

        let refresh = async move {
            counter.fetch_add(1, Ordering::Relaxed);
            info!("Refreshing session credential");
            match provider.refresh().await {
                Ok(token) => {
                    let credential = Credential::new(token, Utc::now(), lifetime);
                    *current.write().unwrap_or_else(|p| p.into_inner()) = Some(credential.clone());
                    Ok(credential)
                }
                Err(err) => {
                    warn!(error = %err, "Session credential refresh failed");
                    Err(err)
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(refresh.clone());
        refresh
    }
}
