//! Error types for minion activity scheduling and resolution.

use crate::activity::{TaskId, UserId};

/// Top-level error type for the activity engine.
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    /// A precondition failed before enqueue. Carries the narrative shown to the user.
    #[error("{0}")]
    Validation(String),

    /// The user already has an unresolved task.
    #[error("minion of user {user_id} is busy")]
    AlreadyBusy {
        /// Owner of the unresolved task.
        user_id: UserId,
    },

    /// A shortfall discovered while resolving a task (coins, items).
    #[error("{0}")]
    InsufficientResources(String),

    /// Unexpected failure inside a resolution handler.
    #[error("handler fault in task {task_id}: {message}")]
    HandlerFault {
        /// Task being resolved.
        task_id: TaskId,
        /// Fault description.
        message: String,
    },

    /// An external call exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Task or user state store error.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActivityError {
    /// Returns `true` for failures the user caused and should read about.
    ///
    /// Everything else is an operator concern.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::AlreadyBusy { .. } | Self::InsufficientResources(_)
        )
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ActivityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_classification() {
        assert!(ActivityError::Validation("no".to_owned()).is_user_facing());
        assert!(
            ActivityError::AlreadyBusy {
                user_id: UserId::new("u1")
            }
            .is_user_facing()
        );
        assert!(ActivityError::InsufficientResources("coins".to_owned()).is_user_facing());
        assert!(!ActivityError::Timeout("bank".to_owned()).is_user_facing());
        assert!(!ActivityError::Store("gone".to_owned()).is_user_facing());
    }

    #[test]
    fn narrative_errors_display_verbatim() {
        let err = ActivityError::Validation("JalYt, come back later.".to_owned());
        assert_eq!(err.to_string(), "JalYt, come back later.");
    }
}
