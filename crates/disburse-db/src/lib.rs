//! # disburse-db
//!
//! SQLite persistence for the distribution engine.
//!
//! ## Schema
//!
//! - WAL mode, foreign keys enforced
//! - Schema version stored in `PRAGMA user_version`
//! - Engine state tables mirror the in-memory model one-to-one
//! - Amounts are `u128` and stored as decimal TEXT

pub mod migrations;
pub mod queries;
pub mod schema;

use std::path::Path;

use disburse_types::{Address, Amount};
use rusqlite::Connection;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Parse an address column.
pub(crate) fn parse_address(text: &str) -> Result<Address> {
    text.parse()
        .map_err(|e: disburse_types::TypeError| DbError::Serialization(e.to_string()))
}

/// Parse an amount column.
pub(crate) fn parse_amount(text: &str) -> Result<Amount> {
    text.parse()
        .map_err(|e: std::num::ParseIntError| DbError::Serialization(format!("amount '{text}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory() {
        let conn = open_memory().expect("open in-memory db");
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("get user_version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_memory().expect("open");
        let fk: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("get foreign_keys");
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let conn = open_memory().expect("open");
        migrations::run(&conn).expect("second run is a no-op");
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_amount("340282366920938463463374607431768211455").expect("max"), Amount::MAX);
        assert!(parse_amount("-1").is_err());
        assert!(parse_address("0x01").is_err());
    }
}
