//! SQLite DDL for the task store.

use rusqlite::Connection;

/// Current on-disk schema version.
pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Complete DDL for the task database.
///
/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per unresolved task. The unique user index is the busy check.
CREATE TABLE IF NOT EXISTS activity_tasks (
    id           TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL,
    channel_id   TEXT NOT NULL,
    kind         TEXT NOT NULL,      -- snake_case ActivityKind
    payload      TEXT NOT NULL,      -- JSON ActivityPayload
    enqueue_time INTEGER NOT NULL,
    duration_ms  INTEGER NOT NULL,
    finish_time  INTEGER NOT NULL,
    quantity     INTEGER NOT NULL DEFAULT 1,
    status       TEXT NOT NULL DEFAULT 'pending'
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_user   ON activity_tasks(user_id);
CREATE INDEX IF NOT EXISTS idx_tasks_finish        ON activity_tasks(status, finish_time);
"#;

/// Apply the full schema and stamp the version on a fresh database.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let value: String = row.get(0)?;
            Ok(value.parse::<u32>().ok())
        }
        None => Ok(None),
    }
}
