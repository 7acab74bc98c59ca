use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{format_ts, parse_ts};
use crate::db::DatabaseError;
use crate::models::{PrescriptionSnapshot, TokenRecord};

/// Insert a token row. Returns `false` when the code is already taken,
/// leaving the existing row untouched.
pub fn insert_token(conn: &Connection, record: &TokenRecord) -> Result<bool, DatabaseError> {
    let snapshot = record
        .snapshot
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| DatabaseError::CorruptRow {
            column: "snapshot",
            reason: e.to_string(),
        })?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO prescription_tokens
            (token, patient_ref, issued_at, expires_at, revoked_at, snapshot)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.token,
            record.patient_ref,
            format_ts(record.issued_at),
            format_ts(record.expires_at),
            record.revoked_at.map(format_ts),
            snapshot,
        ],
    )?;
    Ok(inserted == 1)
}

pub fn get_token(conn: &Connection, token: &str) -> Result<Option<TokenRecord>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT token, patient_ref, issued_at, expires_at, revoked_at, snapshot
             FROM prescription_tokens WHERE token = ?1",
            params![token],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some(row) => Ok(Some(record_from_row(row)?)),
        None => Ok(None),
    }
}

/// Mark a token revoked. Only an unrevoked, unexpired token changes;
/// returns whether a row was updated.
pub fn revoke_token(
    conn: &Connection,
    token: &str,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let now = format_ts(now);
    let updated = conn.execute(
        "UPDATE prescription_tokens SET revoked_at = ?2
         WHERE token = ?1 AND revoked_at IS NULL AND expires_at > ?2",
        params![token, now],
    )?;
    Ok(updated == 1)
}

/// All tokens issued for a patient, newest first.
pub fn list_tokens_for_patient(
    conn: &Connection,
    patient_ref: &str,
) -> Result<Vec<TokenRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT token, patient_ref, issued_at, expires_at, revoked_at, snapshot
         FROM prescription_tokens WHERE patient_ref = ?1
         ORDER BY issued_at DESC, token ASC",
    )?;
    let rows = stmt
        .query_map(params![patient_ref], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(record_from_row).collect()
}

/// Drop the snapshot of tokens whose expiry is older than `cutoff`. The
/// row itself is kept, so the code still reports Revoked/Expired and is
/// never reissued.
pub fn purge_expired_snapshots(
    conn: &Connection,
    cutoff: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let purged = conn.execute(
        "UPDATE prescription_tokens SET snapshot = NULL
         WHERE expires_at < ?1 AND snapshot IS NOT NULL",
        params![format_ts(cutoff)],
    )?;
    Ok(purged)
}

type TokenRow = (String, String, String, String, Option<String>, Option<String>);

fn record_from_row(row: TokenRow) -> Result<TokenRecord, DatabaseError> {
    let (token, patient_ref, issued_at, expires_at, revoked_at, snapshot) = row;
    let snapshot = snapshot
        .as_deref()
        .map(serde_json::from_str::<PrescriptionSnapshot>)
        .transpose()
        .map_err(|e| DatabaseError::CorruptRow {
            column: "snapshot",
            reason: e.to_string(),
        })?;
    Ok(TokenRecord {
        token,
        patient_ref,
        issued_at: parse_ts("issued_at", &issued_at)?,
        expires_at: parse_ts("expires_at", &expires_at)?,
        revoked_at: revoked_at
            .as_deref()
            .map(|r| parse_ts("revoked_at", r))
            .transpose()?,
        snapshot,
    })
}
