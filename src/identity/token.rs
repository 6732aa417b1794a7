use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Permit;

/// Expiry used by once-off authentications that are never persisted.
pub fn far_future() -> DateTime<Utc> {
    DateTime::<Utc>::MAX_UTC
}

/// Everything known about one successful authentication event: who authenticated,
/// until when the result is valid, and the identity's permit at that moment.
/// The permit is an owned copy, never shared with a store's copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub identity: String,
    pub expires: DateTime<Utc>,
    pub permit: Permit,
}

impl Token {
    pub fn new(identity: String, expires: DateTime<Utc>, permit: Permit) -> Self {
        Self { identity, expires, permit }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Once-off tokens carry the far-future sentinel and should not be cached by callers.
    pub fn is_once_off(&self) -> bool {
        self.expires == far_future()
    }
}
