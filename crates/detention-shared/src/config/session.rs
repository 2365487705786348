//! Credential, approval, checkpoint and analyzer settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Lifetime assumed for a freshly acquired session token
    pub token_lifetime_seconds: u64,
    /// Remaining lifetime required before a chunk starts issuing requests
    pub refresh_margin_seconds: u64,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            token_lifetime_seconds: 25 * 60,
            refresh_margin_seconds: 120,
        }
    }
}

impl CredentialConfig {
    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_seconds)
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// How long a human has to decide before the request times out
    pub timeout_seconds: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 300,
        }
    }
}

impl ApprovalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Storage key for batch progress
    pub key: String,
    /// Checkpoints older than this are discarded instead of resumed
    pub max_age_hours: u64,
    /// Directory for the file-backed store; `None` keeps checkpoints in memory
    pub directory: Option<PathBuf>,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            key: "detention_batch_progress".to_string(),
            max_age_hours: 24,
            directory: None,
        }
    }
}

impl CheckpointConfig {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_age_hours.min(i64::MAX as u64) as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Arrivals later than planned by more than this void detention eligibility
    pub driver_late_threshold_minutes: i64,
    /// Charge code identifying detention pricing lines (holds and charges)
    pub detention_charge_code: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            driver_late_threshold_minutes: 60,
            detention_charge_code: "DETENTION".to_string(),
        }
    }
}
