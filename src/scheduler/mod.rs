//! Task scheduler and completion dispatcher.
//!
//! Tasks are persisted through a [`TaskStore`] at enqueue, one per user, and
//! resolved exactly once by the [`Dispatcher`] when their deadline passes.

pub mod clock;
pub mod dispatch;
pub mod runner;
pub(crate) mod schema;
pub mod sqlite;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatch::{Dispatcher, Incident, Resolution};
pub use runner::{RecoveryReport, Scheduler};
pub use sqlite::SqliteTaskStore;
pub use store::{InMemoryTaskStore, QuarantinedTask, TaskStore};
