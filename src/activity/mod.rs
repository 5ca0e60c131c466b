//! Activity registry.
//!
//! Every deferred minion action is one variant of the closed
//! [`ActivityPayload`] sum type. The variant's discriminant is its
//! [`ActivityKind`], which the dispatcher uses to pick a handler.

pub mod payload;
pub mod task;

pub use payload::{
    ActivityKind, ActivityPayload, CompostTier, FarmingPayload, FightCavesPayload, PatchKind,
    PatchState,
};
pub use task::{ActivityTask, TaskHandle, TaskStatus};

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Player identifier.
    UserId
);
string_id!(
    /// Channel the activity was started from; outcomes are delivered there.
    ChannelId
);
string_id!(
    /// Unique identifier of one scheduled activity.
    TaskId
);

impl TaskId {
    /// Generate a fresh random task id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
