//! Repository layer: entity-scoped database operations.

mod token;
mod token_event;

use chrono::{DateTime, SecondsFormat, Utc};

use super::DatabaseError;

pub use token::*;
pub use token_event::*;

/// Fixed-width RFC 3339 so lexical order in SQLite matches time order.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(column: &'static str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow {
            column,
            reason: e.to_string(),
        })
}
