//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Engine state
-- ============================================================

CREATE TABLE IF NOT EXISTS governance (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    owner TEXT NOT NULL,
    pending_owner TEXT,
    operator TEXT NOT NULL,
    paused INTEGER NOT NULL DEFAULT 0,
    funding_source TEXT NOT NULL,
    asset TEXT NOT NULL,
    custody TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS roles (
    role TEXT PRIMARY KEY,
    address TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS retained_balances (
    account TEXT PRIMARY KEY,
    amount TEXT NOT NULL
);

-- ============================================================
-- Built-in asset ledger
-- ============================================================

CREATE TABLE IF NOT EXISTS asset_balances (
    asset TEXT NOT NULL,
    account TEXT NOT NULL,
    amount TEXT NOT NULL,
    PRIMARY KEY (asset, account)
);

-- ============================================================
-- Committed events
-- ============================================================

CREATE TABLE IF NOT EXISTS event_log (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type TEXT NOT NULL,
    payload TEXT NOT NULL,
    recorded_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_event_log_type ON event_log(event_type);
"#;
