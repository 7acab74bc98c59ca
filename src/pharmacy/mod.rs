//! Pharmacy handoff: short-lived read-only tokens that let an external
//! pharmacist view a redacted prescription.
//!
//! Lifecycle: `ACTIVE --revoke--> REVOKED`, `ACTIVE --expiry--> EXPIRED`.
//! Both end states are terminal and revocation is checked first.

pub mod demo;
pub mod qr;
pub mod snapshot;
pub mod store;
pub mod token_code;

pub use demo::DemoCatalog;
pub use store::{SweepReport, TokenStore};

use sha2::{Digest, Sha256};

use crate::db::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token not found")]
    NotFound,
    #[error("Token has been revoked")]
    Revoked,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid prescription details: {0}")]
    InvalidDetails(String),
    #[error("Could not allocate a unique token code")]
    CodeSpaceExhausted,
    #[error("Token store lock poisoned")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Stable, non-reversible reference to a token for logs and the audit
/// table: first 12 hex chars of SHA-256 over the normalized code.
pub fn fingerprint(code: &str) -> String {
    let digest = Sha256::digest(token_code::normalize_code(code).as_bytes());
    digest
        .iter()
        .take(6)
        .map(|b| format!("{b:02x}"))
        .collect()
}
