//! Resolution handlers.
//!
//! One handler per [`ActivityKind`]. A handler reads the task payload and
//! live user state, rolls its outcome with the context's random source and
//! commits the result through the state store.

pub mod farming;
pub mod fight_caves;

use std::sync::Arc;

use async_trait::async_trait;

use crate::activity::{
    ActivityKind, ActivityPayload, ActivityTask, ChannelId, TaskHandle, UserId,
};
use crate::content::ContentTables;
use crate::error::Result;
use crate::notifier::Attachment;
use crate::rng::RandomSource;
use crate::scheduler::Scheduler;
use crate::state::{LootBundle, UserStateStore};

pub use farming::FarmingHandler;
pub use fight_caves::FightCavesHandler;

/// Everything a handler may touch while resolving one task.
pub struct HandlerContext {
    pub state: Arc<dyn UserStateStore>,
    pub rng: Box<dyn RandomSource>,
    pub content: Arc<dyn ContentTables>,
    /// Resolution time, epoch milliseconds.
    pub now_ms: u64,
}

/// What a handler reports back after committing its mutations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityOutcome {
    /// Narrative text for the originating channel.
    pub message: String,
    pub attachments: Vec<Attachment>,
    /// Time the minion actually spent, when shorter than the scheduled duration.
    pub effective_duration_ms: Option<u64>,
}

impl ActivityOutcome {
    /// Outcome with only narrative text.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Resolves one activity kind once its task is due.
///
/// A handler commits its outcome through the context's state store and
/// returns the narrative. User-facing errors are narrated to the user;
/// anything else becomes an incident.
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    /// The payload discriminant this handler resolves.
    fn kind(&self) -> ActivityKind;

    /// Roll and commit the outcome of `task`.
    async fn resolve(&self, task: &ActivityTask, ctx: &mut HandlerContext)
    -> Result<ActivityOutcome>;
}

/// Collaborators used when a trip is planned, before anything is enqueued.
#[derive(Clone, Copy)]
pub struct PlanningContext<'a> {
    pub scheduler: &'a Scheduler,
    pub state: &'a dyn UserStateStore,
    pub content: &'a dyn ContentTables,
}

/// The handlers shipped with this crate.
pub fn standard_handlers() -> Vec<Arc<dyn ActivityHandler>> {
    vec![Arc::new(FightCavesHandler), Arc::new(FarmingHandler)]
}

/// Minion display name used in narrative text.
pub(crate) async fn minion_name(state: &dyn UserStateStore, task: &ActivityTask) -> Result<String> {
    let name = crate::state::keys::MINION_NAME.load(state, &task.user_id).await?;
    Ok(name.unwrap_or_else(|| "Your minion".to_owned()))
}

/// "10x Prayer potion(4), 6x Saradomin brew(4)".
pub(crate) fn readable_items(content: &dyn ContentTables, items: &LootBundle) -> String {
    if items.is_empty() {
        return "nothing".to_owned();
    }
    items
        .iter()
        .map(|(item, quantity)| format!("{quantity}x {}", content.item_name(item)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Enqueue a trip whose `cost` was already taken from the bank.
///
/// If the enqueue fails (typically a concurrent trip won the race) the cost
/// goes back to the bank before the error is returned.
pub(crate) async fn enqueue_paid(
    ctx: &PlanningContext<'_>,
    user: &UserId,
    channel: &ChannelId,
    payload: ActivityPayload,
    duration_ms: u64,
    quantity: u32,
    cost: &LootBundle,
) -> Result<TaskHandle> {
    match ctx
        .scheduler
        .enqueue(user.clone(), channel.clone(), payload, duration_ms, quantity)
    {
        Ok(handle) => Ok(handle),
        Err(e) => {
            if !cost.is_empty() {
                if let Err(refund) = ctx.state.add_to_bank(user, cost).await {
                    tracing::error!(user_id = %user, "cannot refund trip cost: {refund}");
                }
            }
            Err(e)
        }
    }
}

/// Render `ms` as "1 hour, 5 minutes" style text.
pub(crate) fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let plural = |n: u64, unit: &str| {
        if n == 1 {
            format!("1 {unit}")
        } else {
            format!("{n} {unit}s")
        }
    };
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if minutes > 0 {
        parts.push(plural(minutes, "minute"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(plural(seconds, "second"));
    }
    parts.join(", ")
}
