use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{TokenEventKind, TokenStatus};
use super::prescription::PrescriptionSnapshot;

/// A handoff token as persisted by the issuing server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub token: String,
    pub patient_ref: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set once by revocation; never cleared.
    pub revoked_at: Option<DateTime<Utc>>,
    /// `None` after the retention sweep purged the payload.
    pub snapshot: Option<PrescriptionSnapshot>,
}

impl TokenRecord {
    /// Lifecycle state at `now`. Revocation wins over expiry: both are
    /// terminal, and a token revoked while active stays revoked.
    pub fn status_at(&self, now: DateTime<Utc>) -> TokenStatus {
        if self.revoked_at.is_some() {
            TokenStatus::Revoked
        } else if now >= self.expires_at {
            TokenStatus::Expired
        } else {
            TokenStatus::Active
        }
    }
}

/// Audit trail entry for a token lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEvent {
    pub id: String,
    /// Truncated SHA-256 of the token code; the code itself is not logged.
    pub token_fingerprint: String,
    pub patient_ref: Option<String>,
    pub kind: TokenEventKind,
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
