//! SQLite-backed [`TaskStore`].

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::error;

use crate::activity::{
    ActivityKind, ActivityPayload, ActivityTask, ChannelId, TaskId, TaskStatus, UserId,
};
use crate::config::SchedulerConfig;
use crate::error::{ActivityError, Result};
use crate::scheduler::schema::{apply_schema, read_schema_version};
use crate::scheduler::store::{QuarantinedTask, TaskStore};

/// Default database filename inside the data directory.
pub const DB_FILENAME: &str = "minion_tasks.db";

const TASK_COLUMNS: &str = "id, user_id, channel_id, kind, payload, enqueue_time, \
     duration_ms, finish_time, quantity, status";

/// Task records in a single SQLite file.
///
/// Thread-safe via an internal `Mutex<Connection>`; every statement is short.
///
/// Rows that no longer decode (an unknown kind or status, or a payload
/// from an incompatible version) are deleted on read and held until
/// [`TaskStore::take_quarantined`] collects them, so one bad record never
/// hides the healthy ones.
pub struct SqliteTaskStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
    quarantined: Mutex<Vec<QuarantinedTask>>,
}

impl SqliteTaskStore {
    /// Open (or create) the database at `path`, applying the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
            quarantined: Mutex::new(Vec::new()),
        })
    }

    /// Open the database named by `config`, defaulting to [`DB_FILENAME`] in
    /// the data directory.
    pub fn from_config(config: &SchedulerConfig) -> Result<Self> {
        Self::open(&config.effective_database_path())
    }

    /// Open a private in-memory database. Records die with the store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
            quarantined: Mutex::new(Vec::new()),
        })
    }

    /// Database file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Schema version recorded in the database.
    pub fn schema_version(&self) -> Result<Option<u32>> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ActivityError::Store(format!("task db lock poisoned: {e}")))
    }

    fn query_tasks(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<ActivityTask>> {
        let conn = self.lock()?;
        let rows: Vec<TaskRow> = {
            let mut stmt = conn.prepare(sql)?;
            let mapped = stmt.query_map(args, TaskRow::from_row)?;
            mapped.collect::<rusqlite::Result<_>>()?
        };
        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(task) = self.decode_or_quarantine(&conn, row)? {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    /// Decode `row`, or delete it and keep its raw columns for an incident.
    fn decode_or_quarantine(&self, conn: &Connection, row: TaskRow) -> Result<Option<ActivityTask>> {
        let err = match row.decode() {
            Ok(task) => return Ok(Some(task)),
            Err(err) => err,
        };
        conn.execute(
            "DELETE FROM activity_tasks WHERE id = ?1",
            params![row.id.as_str()],
        )?;
        error!(
            task_id = %row.id,
            user_id = %row.user_id,
            kind = %row.kind,
            payload = %row.payload,
            "quarantined undecodable task record: {err}"
        );
        let record = QuarantinedTask {
            id: TaskId::new(row.id),
            user_id: UserId::new(row.user_id),
            channel_id: ChannelId::new(row.channel_id),
            kind: row.kind,
            payload: row.payload,
            status: row.status,
            error: err.to_string(),
        };
        self.quarantined
            .lock()
            .map_err(|e| ActivityError::Store(format!("quarantine lock poisoned: {e}")))?
            .push(record);
        Ok(None)
    }
}

/// Raw column values, decoded into an [`ActivityTask`] outside the row callback.
struct TaskRow {
    id: String,
    user_id: String,
    channel_id: String,
    kind: String,
    payload: String,
    enqueue_time: i64,
    duration_ms: i64,
    finish_time: i64,
    quantity: i64,
    status: String,
}

impl TaskRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            channel_id: row.get(2)?,
            kind: row.get(3)?,
            payload: row.get(4)?,
            enqueue_time: row.get(5)?,
            duration_ms: row.get(6)?,
            finish_time: row.get(7)?,
            quantity: row.get(8)?,
            status: row.get(9)?,
        })
    }

    fn decode(&self) -> Result<ActivityTask> {
        let kind = ActivityKind::parse(&self.kind)
            .ok_or_else(|| ActivityError::Store(format!("unknown activity kind `{}`", self.kind)))?;
        let status = TaskStatus::parse(&self.status)
            .ok_or_else(|| ActivityError::Store(format!("unknown task status `{}`", self.status)))?;
        let payload: ActivityPayload = serde_json::from_str(&self.payload)?;
        if payload.kind() != kind {
            return Err(ActivityError::Store(format!(
                "task {} stores kind {kind} with a {} payload",
                self.id,
                payload.kind()
            )));
        }
        Ok(ActivityTask {
            id: TaskId::new(self.id.clone()),
            user_id: UserId::new(self.user_id.clone()),
            channel_id: ChannelId::new(self.channel_id.clone()),
            kind,
            payload,
            enqueue_time: from_sql_ms(self.enqueue_time),
            duration_ms: from_sql_ms(self.duration_ms),
            finish_time: from_sql_ms(self.finish_time),
            quantity: u32::try_from(self.quantity).unwrap_or(0),
            status,
        })
    }
}

fn to_sql_ms(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_sql_ms(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl TaskStore for SqliteTaskStore {
    fn insert(&self, task: &ActivityTask) -> Result<()> {
        let payload = serde_json::to_string(&task.payload)?;
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO activity_tasks \
             (id, user_id, channel_id, kind, payload, enqueue_time, duration_ms, \
              finish_time, quantity, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                task.id.as_str(),
                task.user_id.as_str(),
                task.channel_id.as_str(),
                task.kind.as_str(),
                payload,
                to_sql_ms(task.enqueue_time),
                to_sql_ms(task.duration_ms),
                to_sql_ms(task.finish_time),
                i64::from(task.quantity),
                task.status.as_str(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(ActivityError::AlreadyBusy {
                    user_id: task.user_id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn active_for_user(&self, user: &UserId) -> Result<Option<ActivityTask>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM activity_tasks WHERE user_id = ?1"),
                params![user.as_str()],
                TaskRow::from_row,
            )
            .optional()?;
        match row {
            Some(row) => self.decode_or_quarantine(&conn, row),
            None => Ok(None),
        }
    }

    fn pending(&self) -> Result<Vec<ActivityTask>> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM activity_tasks \
                 WHERE status = 'pending' ORDER BY finish_time ASC"
            ),
            [],
        )
    }

    fn next_deadline(&self) -> Result<Option<u64>> {
        let conn = self.lock()?;
        let min: Option<i64> = conn.query_row(
            "SELECT MIN(finish_time) FROM activity_tasks WHERE status = 'pending'",
            [],
            |row| row.get(0),
        )?;
        Ok(min.map(from_sql_ms))
    }

    fn due(&self, now_ms: u64) -> Result<Vec<ActivityTask>> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM activity_tasks \
                 WHERE status = 'pending' AND finish_time <= ?1 ORDER BY finish_time ASC"
            ),
            params![to_sql_ms(now_ms)],
        )
    }

    fn claim(&self, id: &TaskId) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE activity_tasks SET status = 'resolving' \
             WHERE id = ?1 AND status = 'pending'",
            params![id.as_str()],
        )?;
        Ok(changed == 1)
    }

    fn retire(&self, id: &TaskId) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM activity_tasks WHERE id = ?1",
            params![id.as_str()],
        )?;
        Ok(changed == 1)
    }

    fn interrupted(&self) -> Result<Vec<ActivityTask>> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM activity_tasks \
                 WHERE status = 'resolving' ORDER BY finish_time ASC"
            ),
            [],
        )
    }

    fn take_quarantined(&self) -> Result<Vec<QuarantinedTask>> {
        let mut quarantined = self
            .quarantined
            .lock()
            .map_err(|e| ActivityError::Store(format!("quarantine lock poisoned: {e}")))?;
        Ok(std::mem::take(&mut *quarantined))
    }
}
