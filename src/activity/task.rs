//! The persisted activity task record.

use crate::activity::{ActivityKind, ActivityPayload, ChannelId, TaskId, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle of a persisted task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for its deadline.
    Pending,
    /// Claimed by the dispatcher; the handler may have mutated state.
    Resolving,
}

impl TaskStatus {
    /// Persisted column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolving => "resolving",
        }
    }

    /// Parse a persisted column value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "resolving" => Some(Self::Resolving),
            _ => None,
        }
    }
}

/// A single deferred minion activity.
///
/// Created at enqueue, resolved exactly once, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTask {
    pub id: TaskId,
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub kind: ActivityKind,
    pub payload: ActivityPayload,
    /// Epoch milliseconds the task was enqueued.
    pub enqueue_time: u64,
    pub duration_ms: u64,
    /// Always `enqueue_time + duration_ms`.
    pub finish_time: u64,
    pub quantity: u32,
    pub status: TaskStatus,
}

impl ActivityTask {
    /// Build a pending task starting at `enqueue_time`.
    pub fn new(
        user_id: UserId,
        channel_id: ChannelId,
        payload: ActivityPayload,
        enqueue_time: u64,
        duration_ms: u64,
        quantity: u32,
    ) -> Self {
        Self {
            id: TaskId::generate(),
            user_id,
            channel_id,
            kind: payload.kind(),
            payload,
            enqueue_time,
            duration_ms,
            finish_time: enqueue_time.saturating_add(duration_ms),
            quantity,
            status: TaskStatus::Pending,
        }
    }

    /// Returns `true` once the deadline has passed.
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms >= self.finish_time
    }

    /// Finish time as a UTC timestamp, for logs and status displays.
    pub fn finish_date(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let millis = i64::try_from(self.finish_time).ok()?;
        chrono::DateTime::from_timestamp_millis(millis)
    }

    /// Handle returned to the caller of enqueue.
    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            id: self.id.clone(),
            kind: self.kind,
            finish_time: self.finish_time,
        }
    }
}

/// What the scheduler hands back after a successful enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: TaskId,
    pub kind: ActivityKind,
    pub finish_time: u64,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn sample(enqueue: u64, duration: u64) -> ActivityTask {
        ActivityTask::new(
            UserId::new("u1"),
            ChannelId::new("c1"),
            ActivityPayload::Questing,
            enqueue,
            duration,
            1,
        )
    }

    #[test]
    fn finish_time_is_enqueue_plus_duration() {
        let task = sample(1_000, 2_500);
        assert_eq!(task.finish_time, 3_500);
        assert_eq!(task.kind, ActivityKind::Questing);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn is_due_at_and_after_deadline() {
        let task = sample(0, 100);
        assert!(!task.is_due(99));
        assert!(task.is_due(100));
        assert!(task.is_due(101));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(sample(0, 1).id, sample(0, 1).id);
    }

    #[test]
    fn finish_date_converts_epoch_millis() {
        let task = sample(1_700_000_000_000, 60_000);
        let date = task.finish_date().expect("valid timestamp");
        assert_eq!(date.timestamp_millis(), 1_700_000_060_000);
    }

    #[test]
    fn status_round_trips_through_column_value() {
        for status in [TaskStatus::Pending, TaskStatus::Resolving] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
    }
}
