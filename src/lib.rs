//! Minion activities: deferred task scheduling and resolution.
//!
//! A user starts an activity; the minion is busy until the task's deadline
//! passes, then a handler resolves the outcome and the result is posted back
//! to the originating channel.
//!
//! # Architecture
//!
//! - **Scheduler**: persists one task per user and wakes at the earliest deadline
//! - **Dispatcher**: claims due tasks and routes them to a handler by kind
//! - **Handlers**: Fight Caves and Farming resolution
//! - **State**: bank, skills, kill counts and settings behind [`state::UserStateStore`]
//! - **Notifier**: delivers narrative results to channels

pub mod activity;
pub mod config;
pub mod content;
pub mod error;
pub mod handlers;
pub mod minion_dirs;
pub mod notifier;
pub mod rng;
pub mod scheduler;
pub mod state;

pub use activity::{
    ActivityKind, ActivityPayload, ActivityTask, ChannelId, TaskHandle, TaskId, UserId,
};
pub use config::MinionConfig;
pub use error::{ActivityError, Result};
pub use handlers::{ActivityHandler, ActivityOutcome, HandlerContext, standard_handlers};
pub use notifier::{Notifier, OutboundMessage};
pub use scheduler::{Dispatcher, Scheduler};
