use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{format_ts, parse_ts};
use crate::db::DatabaseError;
use crate::models::{TokenEvent, TokenEventKind};

pub fn insert_event(conn: &Connection, event: &TokenEvent) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO token_events (id, token_fingerprint, patient_ref, kind, detail, occurred_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.id,
            event.token_fingerprint,
            event.patient_ref,
            event.kind.as_str(),
            event.detail,
            format_ts(event.occurred_at),
        ],
    )?;
    Ok(())
}

/// Events recorded against one token fingerprint, oldest first.
pub fn list_events_for_fingerprint(
    conn: &Connection,
    fingerprint: &str,
) -> Result<Vec<TokenEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, token_fingerprint, patient_ref, kind, detail, occurred_at
         FROM token_events WHERE token_fingerprint = ?1
         ORDER BY occurred_at ASC, rowid ASC",
    )?;
    let rows = stmt
        .query_map(params![fingerprint], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut events = Vec::with_capacity(rows.len());
    for (id, token_fingerprint, patient_ref, kind, detail, occurred_at) in rows {
        events.push(TokenEvent {
            id,
            token_fingerprint,
            patient_ref,
            kind: TokenEventKind::from_str(&kind)?,
            detail,
            occurred_at: parse_ts("occurred_at", &occurred_at)?,
        });
    }
    Ok(events)
}

/// Prune events older than `cutoff`.
pub fn prune_events(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM token_events WHERE occurred_at < ?1",
        params![format_ts(cutoff)],
    )?;
    Ok(deleted)
}
