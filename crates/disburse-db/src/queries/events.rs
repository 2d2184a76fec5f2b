//! Append-only log of committed engine events.

use disburse_types::DistributorEvent;
use rusqlite::Connection;

use crate::{DbError, Result};

/// A stored event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub seq: i64,
    pub event: DistributorEvent,
    pub recorded_at: u64,
}

/// Append one event. Returns its sequence number.
pub fn append(conn: &Connection, event: &DistributorEvent, recorded_at: u64) -> Result<i64> {
    let payload =
        serde_json::to_string(event).map_err(|e| DbError::Serialization(e.to_string()))?;
    conn.execute(
        "INSERT INTO event_log (event_type, payload, recorded_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![event.name(), payload, recorded_at as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Events with `seq > after`, oldest first.
pub fn list(conn: &Connection, after: i64, limit: u32) -> Result<Vec<EventRow>> {
    let mut stmt = conn.prepare(
        "SELECT seq, payload, recorded_at FROM event_log
         WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2",
    )?;

    let raw = stmt
        .query_map(rusqlite::params![after, limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)? as u64,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(seq, payload, recorded_at)| {
            let event = serde_json::from_str(&payload)
                .map_err(|e| DbError::Serialization(format!("event {seq}: {e}")))?;
            Ok(EventRow {
                seq,
                event,
                recorded_at,
            })
        })
        .collect()
}

/// Number of stored events.
pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM event_log", [], |row| row.get(0))?;
    Ok(n as u64)
}
