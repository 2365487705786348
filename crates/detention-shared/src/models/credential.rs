use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session token shared by every downstream call
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>, acquired_at: DateTime<Utc>, lifetime: chrono::Duration) -> Self {
        Self {
            token: token.into(),
            acquired_at,
            expires_at: acquired_at + lifetime,
        }
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.expires_at - now
    }

    /// Still valid for at least `margin` after `now`
    pub fn is_fresh_for(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        self.remaining(now) > margin
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("acquired_at", &self.acquired_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_and_redaction() {
        let now = Utc::now();
        let cred = Credential::new("secret", now, chrono::Duration::minutes(25));
        assert!(cred.is_fresh_for(now, chrono::Duration::minutes(2)));
        assert!(!cred.is_fresh_for(now + chrono::Duration::minutes(24), chrono::Duration::minutes(2)));
        assert!(!format!("{cred:?}").contains("secret"));
    }
}
