//! Persisted task records.
//!
//! A record is `pending` from enqueue until its deadline, `resolving` once
//! the dispatcher has claimed it, and gone once retired. The busy check
//! sees the record in both states.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::activity::{ActivityTask, ChannelId, TaskId, TaskStatus, UserId};
use crate::error::{ActivityError, Result};

/// Raw columns of a record that could not be decoded and was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantinedTask {
    pub id: TaskId,
    pub user_id: UserId,
    pub channel_id: ChannelId,
    /// Stored kind name, possibly one this build does not know.
    pub kind: String,
    /// Stored payload text, verbatim.
    pub payload: String,
    pub status: String,
    /// Why decoding failed.
    pub error: String,
}

/// Durable storage for unresolved tasks.
pub trait TaskStore: Send + Sync {
    /// Persist a new pending task.
    ///
    /// Fails with [`ActivityError::AlreadyBusy`] when the user already owns
    /// a record, atomically with the insert.
    fn insert(&self, task: &ActivityTask) -> Result<()>;

    /// The user's unresolved task, pending or resolving.
    fn active_for_user(&self, user: &UserId) -> Result<Option<ActivityTask>>;

    /// All pending tasks, earliest deadline first.
    fn pending(&self) -> Result<Vec<ActivityTask>>;

    /// Earliest `finish_time` among pending tasks.
    fn next_deadline(&self) -> Result<Option<u64>>;

    /// Pending tasks whose deadline is at or before `now_ms`.
    fn due(&self, now_ms: u64) -> Result<Vec<ActivityTask>>;

    /// Move a task from pending to resolving.
    ///
    /// Returns `false` if the task is gone or another caller already claimed it.
    fn claim(&self, id: &TaskId) -> Result<bool>;

    /// Delete the record. Returns `false` if it did not exist.
    fn retire(&self, id: &TaskId) -> Result<bool>;

    /// Tasks left in `resolving`, i.e. interrupted mid-resolution.
    fn interrupted(&self) -> Result<Vec<ActivityTask>>;

    /// Drain records removed since the last call because they could not be
    /// decoded. Reads skip such records instead of failing.
    fn take_quarantined(&self) -> Result<Vec<QuarantinedTask>> {
        Ok(Vec::new())
    }
}

/// [`TaskStore`] held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<TaskId, ActivityTask>>,
}

impl InMemoryTaskStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TaskId, ActivityTask>>> {
        self.tasks
            .lock()
            .map_err(|e| ActivityError::Store(format!("task store lock poisoned: {e}")))
    }

    fn with_status(&self, status: TaskStatus) -> Result<Vec<ActivityTask>> {
        let tasks = self.lock()?;
        let mut matching: Vec<ActivityTask> = tasks
            .values()
            .filter(|task| task.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|task| task.finish_time);
        Ok(matching)
    }
}

impl TaskStore for InMemoryTaskStore {
    fn insert(&self, task: &ActivityTask) -> Result<()> {
        let mut tasks = self.lock()?;
        if tasks.values().any(|t| t.user_id == task.user_id) {
            return Err(ActivityError::AlreadyBusy {
                user_id: task.user_id.clone(),
            });
        }
        tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn active_for_user(&self, user: &UserId) -> Result<Option<ActivityTask>> {
        let tasks = self.lock()?;
        Ok(tasks.values().find(|t| &t.user_id == user).cloned())
    }

    fn pending(&self) -> Result<Vec<ActivityTask>> {
        self.with_status(TaskStatus::Pending)
    }

    fn next_deadline(&self) -> Result<Option<u64>> {
        let tasks = self.lock()?;
        Ok(tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .map(|t| t.finish_time)
            .min())
    }

    fn due(&self, now_ms: u64) -> Result<Vec<ActivityTask>> {
        let mut pending = self.pending()?;
        pending.retain(|t| t.is_due(now_ms));
        Ok(pending)
    }

    fn claim(&self, id: &TaskId) -> Result<bool> {
        let mut tasks = self.lock()?;
        match tasks.get_mut(id) {
            Some(task) if task.status == TaskStatus::Pending => {
                task.status = TaskStatus::Resolving;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn retire(&self, id: &TaskId) -> Result<bool> {
        Ok(self.lock()?.remove(id).is_some())
    }

    fn interrupted(&self) -> Result<Vec<ActivityTask>> {
        self.with_status(TaskStatus::Resolving)
    }
}
