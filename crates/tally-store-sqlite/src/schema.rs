//! SQL schema for the Tally SQLite ledger.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Current value per key. Keys compare byte-wise (BINARY collation), which
-- defines range-scan order.
CREATE TABLE IF NOT EXISTS world_state (
    key         TEXT PRIMARY KEY,
    value       BLOB NOT NULL,
    tx_id       TEXT NOT NULL,   -- transaction that wrote the current value
    ts_seconds  INTEGER NOT NULL,
    ts_nanos    INTEGER NOT NULL
);

-- Every write ever made, strictly append-only.
-- `seq` defines commit order.
CREATE TABLE IF NOT EXISTS history (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    key         TEXT NOT NULL,
    tx_id       TEXT NOT NULL,
    value       BLOB NOT NULL,
    ts_seconds  INTEGER NOT NULL,
    ts_nanos    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS history_key_idx ON history(key, seq);

PRAGMA user_version = 1;
";
