use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS drafts (
    unit_id TEXT NOT NULL,
    group_id TEXT NOT NULL DEFAULT '',
    role TEXT NOT NULL,
    snapshot_id BLOB NOT NULL CHECK (length(snapshot_id) = 16),
    saved_at INTEGER NOT NULL,
    payload BLOB NOT NULL,
    PRIMARY KEY (unit_id, group_id, role)
);
";
