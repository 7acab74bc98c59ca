//! Persistent token store.
//!
//! One SQLite connection behind a `Mutex`: every operation does its
//! read-check-write under the lock, so operations on the same token are
//! linearizable. Each `*_at` variant takes the clock explicitly.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rusqlite::Connection;
use uuid::Uuid;

use super::snapshot::build_snapshot;
use super::token_code::{generate_code, is_issued_code, normalize_code};
use super::{fingerprint, TokenError};
use crate::db;
use crate::models::{
    PrescriptionDetails, PrescriptionProjection, TokenEvent, TokenEventKind, TokenExpiry,
    TokenRecord, TokenStatus, TokenSummary,
};

/// Attempts to draw an unused code before giving up.
const MAX_CODE_ATTEMPTS: usize = 8;

/// Audit events are kept this long regardless of token retention.
pub const EVENT_RETENTION_DAYS: i64 = 90;

const MAX_PATIENT_REF_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub snapshots_purged: usize,
    pub events_pruned: usize,
}

pub struct TokenStore {
    conn: Mutex<Connection>,
    ttl: Duration,
}

impl TokenStore {
    pub fn new(conn: Connection, ttl_hours: i64) -> Self {
        Self {
            conn: Mutex::new(conn),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// In-memory store (tests, demos).
    pub fn in_memory(ttl_hours: i64) -> Result<Self, TokenError> {
        Ok(Self::new(db::open_memory_database()?, ttl_hours))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TokenError> {
        self.conn.lock().map_err(|_| TokenError::LockPoisoned)
    }

    // ── Issue ───────────────────────────────────────────────

    pub fn issue(
        &self,
        patient_ref: &str,
        details: &PrescriptionDetails,
    ) -> Result<TokenRecord, TokenError> {
        self.issue_at(patient_ref, details, Utc::now(), &mut rand::thread_rng())
    }

    /// Create a token bound to a redacted snapshot of `details`. Earlier
    /// tokens for the same patient are left as they are.
    pub fn issue_at<R: Rng + ?Sized>(
        &self,
        patient_ref: &str,
        details: &PrescriptionDetails,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<TokenRecord, TokenError> {
        let patient_ref = patient_ref.trim();
        if patient_ref.is_empty() {
            return Err(TokenError::InvalidDetails("patientId is required".into()));
        }
        if patient_ref.chars().count() > MAX_PATIENT_REF_LEN {
            return Err(TokenError::InvalidDetails(format!(
                "patientId exceeds {MAX_PATIENT_REF_LEN} characters"
            )));
        }

        let snapshot = Some(build_snapshot(details, now)?);
        let mut record = TokenRecord {
            token: String::new(),
            patient_ref: patient_ref.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
            revoked_at: None,
            snapshot,
        };

        let conn = self.lock()?;
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            record.token = generate_code(rng);
            if db::insert_token(&conn, &record)? {
                let token_fp = fingerprint(&record.token);
                tracing::info!(
                    token_fp = %token_fp,
                    patient_ref = %record.patient_ref,
                    expires_at = %record.expires_at,
                    "Handoff token issued"
                );
                record_event(
                    &conn,
                    &token_fp,
                    Some(&record.patient_ref),
                    TokenEventKind::Issued,
                    None,
                    now,
                );
                return Ok(record);
            }
            tracing::debug!(attempt, "Token code collision, drawing again");
        }

        tracing::error!(attempts = MAX_CODE_ATTEMPTS, "Token code space exhausted");
        Err(TokenError::CodeSpaceExhausted)
    }

    // ── Revoke ──────────────────────────────────────────────

    pub fn revoke(&self, code: &str) -> Result<bool, TokenError> {
        self.revoke_at(code, Utc::now())
    }

    /// Revoke an active token. Returns whether anything changed; unknown,
    /// expired and already-revoked tokens are left alone.
    pub fn revoke_at(&self, code: &str, now: DateTime<Utc>) -> Result<bool, TokenError> {
        let code = normalize_code(code);
        let token_fp = fingerprint(&code);

        let conn = self.lock()?;
        let changed = db::revoke_token(&conn, &code, now)?;
        if changed {
            let patient_ref = db::get_token(&conn, &code)?.map(|r| r.patient_ref);
            tracing::info!(token_fp = %token_fp, "Handoff token revoked");
            record_event(
                &conn,
                &token_fp,
                patient_ref.as_deref(),
                TokenEventKind::Revoked,
                None,
                now,
            );
        } else {
            tracing::debug!(token_fp = %token_fp, "Revoke was a no-op");
        }
        Ok(changed)
    }

    // ── Redeem ──────────────────────────────────────────────

    pub fn redeem(&self, code: &str) -> Result<PrescriptionProjection, TokenError> {
        self.redeem_at(code, Utc::now())
    }

    /// Projection of the token's snapshot. Read-only and repeatable; the
    /// audit row written here never affects the result.
    pub fn redeem_at(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<PrescriptionProjection, TokenError> {
        let code = normalize_code(code);
        let token_fp = fingerprint(&code);
        if !is_issued_code(&code) {
            tracing::debug!(token_fp = %token_fp, "Redeem of malformed token");
            return Err(TokenError::NotFound);
        }

        let conn = self.lock()?;
        let record = match db::get_token(&conn, &code)? {
            Some(record) => record,
            None => {
                tracing::debug!(token_fp = %token_fp, "Redeem of unknown token");
                return Err(TokenError::NotFound);
            }
        };

        match record.status_at(now) {
            TokenStatus::Active => {
                // Only snapshots of tokens already past expiry are purged
                let Some(snapshot) = record.snapshot else {
                    tracing::error!(token_fp = %token_fp, "Active token has no snapshot");
                    return Err(TokenError::Database(db::DatabaseError::CorruptRow {
                        column: "snapshot",
                        reason: "missing on active token".into(),
                    }));
                };
                record_event(
                    &conn,
                    &token_fp,
                    Some(&record.patient_ref),
                    TokenEventKind::Redeemed,
                    None,
                    now,
                );
                drop(conn);
                tracing::info!(token_fp = %token_fp, "Handoff token redeemed");
                Ok(PrescriptionProjection::from_snapshot(
                    snapshot,
                    TokenExpiry::At(record.expires_at),
                ))
            }
            status @ (TokenStatus::Revoked | TokenStatus::Expired) => {
                record_event(
                    &conn,
                    &token_fp,
                    Some(&record.patient_ref),
                    TokenEventKind::RedeemRejected,
                    Some(status.as_str()),
                    now,
                );
                tracing::info!(token_fp = %token_fp, status = status.as_str(), "Redeem rejected");
                Err(match status {
                    TokenStatus::Revoked => TokenError::Revoked,
                    _ => TokenError::Expired,
                })
            }
        }
    }

    // ── Queries ─────────────────────────────────────────────

    /// Whether a code was ever issued (any status).
    pub fn exists(&self, code: &str) -> Result<bool, TokenError> {
        let conn = self.lock()?;
        Ok(db::get_token(&conn, &normalize_code(code))?.is_some())
    }

    pub fn list_for_patient(&self, patient_ref: &str) -> Result<Vec<TokenSummary>, TokenError> {
        self.list_for_patient_at(patient_ref, Utc::now())
    }

    /// Every token issued for a patient, newest first, with its status at `now`.
    pub fn list_for_patient_at(
        &self,
        patient_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<TokenSummary>, TokenError> {
        let conn = self.lock()?;
        let records = db::list_tokens_for_patient(&conn, patient_ref.trim())?;
        Ok(records
            .into_iter()
            .map(|r| TokenSummary {
                status: r.status_at(now),
                token: r.token,
                issued_at: r.issued_at,
                expires_at: r.expires_at,
            })
            .collect())
    }

    /// Audit trail for one token, oldest first.
    pub fn events_for(&self, code: &str) -> Result<Vec<TokenEvent>, TokenError> {
        let conn = self.lock()?;
        Ok(db::list_events_for_fingerprint(&conn, &fingerprint(code))?)
    }

    // ── Retention ───────────────────────────────────────────

    pub fn sweep(&self, retention_days: i64) -> Result<SweepReport, TokenError> {
        self.sweep_at(retention_days, Utc::now())
    }

    /// Purge the prescription payload of tokens expired more than
    /// `retention_days` ago and delete audit events older than
    /// [`EVENT_RETENTION_DAYS`]. Token rows stay as tombstones: a purged
    /// code still redeems as Revoked/Expired and is never drawn again.
    pub fn sweep_at(
        &self,
        retention_days: i64,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, TokenError> {
        let cutoff = now - Duration::days(retention_days.max(0));
        let conn = self.lock()?;
        let report = SweepReport {
            snapshots_purged: db::purge_expired_snapshots(&conn, cutoff)?,
            events_pruned: db::prune_events(&conn, now - Duration::days(EVENT_RETENTION_DAYS))?,
        };
        if report != SweepReport::default() {
            tracing::info!(
                snapshots = report.snapshots_purged,
                events = report.events_pruned,
                "Retention sweep pruned rows"
            );
        }
        Ok(report)
    }
}

/// Best-effort audit write: a failure is logged, never surfaced.
fn record_event(
    conn: &Connection,
    token_fp: &str,
    patient_ref: Option<&str>,
    kind: TokenEventKind,
    detail: Option<&str>,
    now: DateTime<Utc>,
) {
    let event = TokenEvent {
        id: Uuid::new_v4().to_string(),
        token_fingerprint: token_fp.to_string(),
        patient_ref: patient_ref.map(str::to_string),
        kind,
        detail: detail.map(str::to_string),
        occurred_at: now,
    };
    if let Err(e) = db::insert_event(conn, &event) {
        tracing::warn!(kind = kind.as_str(), error = %e, "Failed to record token event");
    }
}
