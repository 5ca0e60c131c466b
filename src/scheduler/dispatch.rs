//! Completion dispatcher.
//!
//! Resolves each due task exactly once: the record is claimed before the
//! handler runs and retired afterwards whatever the outcome, so a task is
//! never handed to a handler twice.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::activity::{ActivityKind, ActivityTask, TaskId, UserId};
use crate::content::{ContentTables, StandardContent};
use crate::error::{ActivityError, Result};
use crate::handlers::{ActivityHandler, ActivityOutcome, HandlerContext};
use crate::notifier::{Notifier, OutboundMessage};
use crate::rng::{EntropyRng, RngProvider};
use crate::scheduler::clock::Clock;
use crate::scheduler::store::TaskStore;
use crate::state::keys::DAILY_DURATION;
use crate::state::{TimedStateStore, UserStateStore};

/// Default deadline for each state-store call made by a handler.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// How a single task resolution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Handler committed its outcome.
    Completed,
    /// Handler refused with a user-facing error; the user was told why.
    Rejected,
    /// Unexpected failure; an incident was raised.
    Faulted,
    /// The task was already claimed or retired elsewhere.
    Skipped,
}

/// Operator-facing record of a faulted, interrupted or undecodable task.
///
/// Carries the full payload so the task can be replayed by hand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    pub task_id: TaskId,
    pub user_id: UserId,
    /// Activity kind name as stored; may be unknown to this build.
    pub kind: String,
    /// Payload JSON, or the raw text when it is not valid JSON.
    pub payload: serde_json::Value,
    pub error: String,
    /// Clock time the incident was raised.
    pub at_ms: u64,
}

/// Routes claimed tasks to their [`ActivityHandler`] and commits the result.
pub struct Dispatcher {
    store: Arc<dyn TaskStore>,
    state: Arc<dyn UserStateStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    content: Arc<dyn ContentTables>,
    rng: Arc<dyn RngProvider>,
    handlers: HashMap<ActivityKind, Arc<dyn ActivityHandler>>,
    io_timeout: Duration,
    incident_tx: Option<mpsc::UnboundedSender<Incident>>,
}

impl Dispatcher {
    /// Dispatcher with no handlers, the standard content tables, entropy
    /// randomness and [`DEFAULT_IO_TIMEOUT`].
    pub fn new(
        store: Arc<dyn TaskStore>,
        state: Arc<dyn UserStateStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            state,
            notifier,
            clock,
            content: Arc::new(StandardContent::new()),
            rng: Arc::new(EntropyRng),
            handlers: HashMap::new(),
            io_timeout: DEFAULT_IO_TIMEOUT,
            incident_tx: None,
        }
    }

    /// Register a handler, replacing any previous one for the same kind.
    pub fn with_handler(mut self, handler: Arc<dyn ActivityHandler>) -> Self {
        self.handlers.insert(handler.kind(), handler);
        self
    }

    /// Register several handlers; see [`with_handler`](Self::with_handler).
    pub fn with_handlers(
        mut self,
        handlers: impl IntoIterator<Item = Arc<dyn ActivityHandler>>,
    ) -> Self {
        for handler in handlers {
            self.handlers.insert(handler.kind(), handler);
        }
        self
    }

    /// Replace the item and plant tables handed to handlers.
    pub fn with_content(mut self, content: Arc<dyn ContentTables>) -> Self {
        self.content = content;
        self
    }

    /// Source of the per-resolution random generator.
    pub fn with_rng(mut self, rng: Arc<dyn RngProvider>) -> Self {
        self.rng = rng;
        self
    }

    /// Deadline for each state-store call made by a handler.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Send every [`Incident`] to `tx` in addition to logging it.
    pub fn with_incident_channel(mut self, tx: mpsc::UnboundedSender<Incident>) -> Self {
        self.incident_tx = Some(tx);
        self
    }

    /// Whether tasks of `kind` can be resolved.
    pub fn has_handler(&self, kind: ActivityKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Move `task` to resolving. Only the caller that gets `true` may resolve it.
    pub fn claim(&self, task: &ActivityTask) -> bool {
        match self.store.claim(&task.id) {
            Ok(claimed) => {
                if !claimed {
                    debug!(task_id = %task.id, "task already claimed or retired");
                }
                claimed
            }
            Err(e) => {
                warn!(task_id = %task.id, "cannot claim task, leaving it pending: {e}");
                false
            }
        }
    }

    /// Claim and resolve `task`.
    pub async fn resolve(&self, task: ActivityTask) -> Resolution {
        if !self.claim(&task) {
            return Resolution::Skipped;
        }
        self.resolve_claimed(task).await
    }

    /// Resolve a task this caller has already claimed.
    pub async fn resolve_claimed(&self, task: ActivityTask) -> Resolution {
        debug!(task_id = %task.id, user_id = %task.user_id, kind = %task.kind, "resolving task");

        let state: Arc<dyn UserStateStore> =
            Arc::new(TimedStateStore::new(self.state.clone(), self.io_timeout));
        let result = self.run_handler(&task, state.clone()).await;

        match self.store.retire(&task.id) {
            Ok(true) => {}
            Ok(false) => warn!(task_id = %task.id, "resolved task was already retired"),
            Err(e) => error!(task_id = %task.id, "cannot retire resolved task: {e}"),
        }

        match result {
            Ok(outcome) => {
                self.add_daily_duration(state.as_ref(), &task, &outcome)
                    .await;
                self.deliver(
                    &task,
                    OutboundMessage {
                        text: outcome.message,
                        attachments: outcome.attachments,
                    },
                )
                .await;
                info!(task_id = %task.id, user_id = %task.user_id, kind = %task.kind, "task completed");
                Resolution::Completed
            }
            Err(e) if e.is_user_facing() => {
                info!(task_id = %task.id, user_id = %task.user_id, "task rejected: {e}");
                self.deliver(&task, OutboundMessage::text(e.to_string()))
                    .await;
                Resolution::Rejected
            }
            Err(e) => {
                self.raise_incident(&task, &e);
                self.deliver(
                    &task,
                    OutboundMessage::text(format!(
                        "Something went wrong while your minion was finishing its {} trip. \
                         The problem has been reported.",
                        task.kind
                    )),
                )
                .await;
                Resolution::Faulted
            }
        }
    }

    /// Retire tasks left in `resolving` by a previous process and report them.
    ///
    /// Their handlers may have partially run, so they are never replayed.
    pub fn recover_interrupted(&self) -> Result<Vec<Incident>> {
        let mut incidents = Vec::new();
        for task in self.store.interrupted()? {
            self.store.retire(&task.id)?;
            let fault = ActivityError::HandlerFault {
                task_id: task.id.clone(),
                message: "interrupted during resolution; not replayed".to_owned(),
            };
            incidents.push(self.raise_incident(&task, &fault));
        }
        Ok(incidents)
    }

    /// Raise an incident for every record the store dropped as undecodable.
    ///
    /// The user is not notified: the channel stored with a corrupt record is
    /// not trusted.
    pub fn report_quarantined(&self) -> Vec<Incident> {
        let quarantined = match self.store.take_quarantined() {
            Ok(quarantined) => quarantined,
            Err(e) => {
                warn!("cannot collect quarantined task records: {e}");
                return Vec::new();
            }
        };
        quarantined
            .into_iter()
            .map(|record| {
                let payload = serde_json::from_str(&record.payload)
                    .unwrap_or(serde_json::Value::String(record.payload));
                self.publish(Incident {
                    task_id: record.id,
                    user_id: record.user_id,
                    kind: record.kind,
                    payload,
                    error: format!("quarantined {} record: {}", record.status, record.error),
                    at_ms: self.clock.now_ms(),
                })
            })
            .collect()
    }

    async fn run_handler(
        &self,
        task: &ActivityTask,
        state: Arc<dyn UserStateStore>,
    ) -> Result<ActivityOutcome> {
        let Some(handler) = self.handlers.get(&task.kind).cloned() else {
            return Err(ActivityError::HandlerFault {
                task_id: task.id.clone(),
                message: format!("no handler registered for {}", task.kind),
            });
        };
        let mut ctx = HandlerContext {
            state,
            rng: self.rng.source(),
            content: self.content.clone(),
            now_ms: self.clock.now_ms(),
        };
        let owned = task.clone();
        // Run on its own task so a panicking handler becomes a fault.
        let joined =
            tokio::spawn(async move { handler.resolve(&owned, &mut ctx).await }).await;
        match joined {
            Ok(result) => result,
            Err(join_err) => Err(ActivityError::HandlerFault {
                task_id: task.id.clone(),
                message: format!("handler aborted: {join_err}"),
            }),
        }
    }

    async fn add_daily_duration(
        &self,
        state: &dyn UserStateStore,
        task: &ActivityTask,
        outcome: &ActivityOutcome,
    ) {
        let spent = outcome.effective_duration_ms.unwrap_or(task.duration_ms);
        let update = async {
            let total = DAILY_DURATION.load(state, &task.user_id).await?;
            DAILY_DURATION
                .store(state, &task.user_id, &total.saturating_add(spent))
                .await
        };
        if let Err(e) = update.await {
            warn!(task_id = %task.id, "cannot update daily minion duration: {e}");
        }
    }

    async fn deliver(&self, task: &ActivityTask, message: OutboundMessage) {
        if let Err(e) = self.notifier.send(&task.channel_id, message).await {
            warn!(task_id = %task.id, channel = %task.channel_id, "outcome delivery failed: {e}");
        }
    }

    fn raise_incident(&self, task: &ActivityTask, err: &ActivityError) -> Incident {
        let payload = serde_json::to_value(&task.payload).unwrap_or(serde_json::Value::Null);
        error!(
            task_id = %task.id,
            user_id = %task.user_id,
            kind = %task.kind,
            payload = %payload,
            "activity handler fault: {err}"
        );
        self.publish(Incident {
            task_id: task.id.clone(),
            user_id: task.user_id.clone(),
            kind: task.kind.as_str().to_owned(),
            payload,
            error: err.to_string(),
            at_ms: self.clock.now_ms(),
        })
    }

    fn publish(&self, incident: Incident) -> Incident {
        if let Some(tx) = &self.incident_tx {
            if tx.send(incident.clone()).is_err() {
                warn!(task_id = %incident.task_id, "incident receiver dropped");
            }
        }
        incident
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::activity::{ActivityPayload, ChannelId};
    use crate::notifier::ChannelNotifier;
    use crate::rng::SeededRng;
    use crate::scheduler::clock::ManualClock;
    use crate::scheduler::store::InMemoryTaskStore;
    use crate::state::InMemoryUserStore;
    use async_trait::async_trait;

    struct Scripted {
        kind: ActivityKind,
        reply: fn() -> Result<ActivityOutcome>,
    }

    #[async_trait]
    impl ActivityHandler for Scripted {
        fn kind(&self) -> ActivityKind {
            self.kind
        }

        async fn resolve(
            &self,
            _task: &ActivityTask,
            _ctx: &mut HandlerContext,
        ) -> Result<ActivityOutcome> {
            (self.reply)()
        }
    }

    struct Panicking;

    #[async_trait]
    impl ActivityHandler for Panicking {
        fn kind(&self) -> ActivityKind {
            ActivityKind::Questing
        }

        async fn resolve(
            &self,
            _task: &ActivityTask,
            _ctx: &mut HandlerContext,
        ) -> Result<ActivityOutcome> {
            panic!("boom")
        }
    }

    struct Harness {
        store: Arc<InMemoryTaskStore>,
        state: Arc<InMemoryUserStore>,
        outbox: mpsc::UnboundedReceiver<(ChannelId, OutboundMessage)>,
        incidents: mpsc::UnboundedReceiver<Incident>,
        dispatcher: Dispatcher,
    }

    fn harness(handler: Option<Arc<dyn ActivityHandler>>) -> Harness {
        let store = Arc::new(InMemoryTaskStore::new());
        let state = Arc::new(InMemoryUserStore::new());
        let (notifier, outbox) = ChannelNotifier::channel();
        let (incident_tx, incidents) = mpsc::unbounded_channel();
        let mut dispatcher = Dispatcher::new(
            store.clone(),
            state.clone(),
            Arc::new(notifier),
            Arc::new(ManualClock::new(1_000)),
        )
        .with_rng(Arc::new(SeededRng::new(1)))
        .with_incident_channel(incident_tx);
        if let Some(handler) = handler {
            dispatcher = dispatcher.with_handler(handler);
        }
        Harness {
            store,
            state,
            outbox,
            incidents,
            dispatcher,
        }
    }

    fn queued(store: &InMemoryTaskStore) -> ActivityTask {
        let task = ActivityTask::new(
            UserId::new("u1"),
            ChannelId::new("c1"),
            ActivityPayload::Questing,
            0,
            60_000,
            1,
        );
        store.insert(&task).unwrap();
        task
    }

    #[tokio::test]
    async fn completed_task_is_retired_notified_and_counted() {
        let mut h = harness(Some(Arc::new(Scripted {
            kind: ActivityKind::Questing,
            reply: || Ok(ActivityOutcome::message("quest done")),
        })));
        let task = queued(&h.store);

        assert_eq!(h.dispatcher.resolve(task.clone()).await, Resolution::Completed);
        assert!(h.store.active_for_user(&task.user_id).unwrap().is_none());
        let (channel, message) = h.outbox.recv().await.unwrap();
        assert_eq!(channel, task.channel_id);
        assert_eq!(message.text, "quest done");
        let daily = DAILY_DURATION
            .load(h.state.as_ref(), &task.user_id)
            .await
            .unwrap();
        assert_eq!(daily, 60_000);
    }

    #[tokio::test]
    async fn second_resolution_is_skipped() {
        let h = harness(Some(Arc::new(Scripted {
            kind: ActivityKind::Questing,
            reply: || Ok(ActivityOutcome::message("once")),
        })));
        let task = queued(&h.store);
        assert_eq!(h.dispatcher.resolve(task.clone()).await, Resolution::Completed);
        assert_eq!(h.dispatcher.resolve(task).await, Resolution::Skipped);
    }

    #[tokio::test]
    async fn user_facing_error_is_narrated_not_reported() {
        let mut h = harness(Some(Arc::new(Scripted {
            kind: ActivityKind::Questing,
            reply: || Err(ActivityError::InsufficientResources("Not enough coins.".into())),
        })));
        let task = queued(&h.store);

        assert_eq!(h.dispatcher.resolve(task.clone()).await, Resolution::Rejected);
        assert!(h.store.active_for_user(&task.user_id).unwrap().is_none());
        assert_eq!(h.outbox.recv().await.unwrap().1.text, "Not enough coins.");
        assert!(h.incidents.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_handler_faults_and_clears_busy_flag() {
        let mut h = harness(None);
        let task = queued(&h.store);

        assert_eq!(h.dispatcher.resolve(task.clone()).await, Resolution::Faulted);
        assert!(h.store.active_for_user(&task.user_id).unwrap().is_none());
        let incident = h.incidents.recv().await.unwrap();
        assert_eq!(incident.task_id, task.id);
        assert_eq!(incident.payload["type"], "questing");
        assert!(h.outbox.recv().await.is_some());
    }

    #[tokio::test]
    async fn panicking_handler_is_a_fault() {
        let mut h = harness(Some(Arc::new(Panicking)));
        let task = queued(&h.store);
        assert_eq!(h.dispatcher.resolve(task.clone()).await, Resolution::Faulted);
        assert!(h.store.active_for_user(&task.user_id).unwrap().is_none());
        assert!(h.incidents.recv().await.unwrap().error.contains("aborted"));
    }

    #[tokio::test]
    async fn interrupted_tasks_are_reported_not_replayed() {
        let mut h = harness(None);
        let task = queued(&h.store);
        assert!(h.store.claim(&task.id).unwrap());

        let incidents = h.dispatcher.recover_interrupted().unwrap();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].task_id, task.id);
        assert!(h.store.active_for_user(&task.user_id).unwrap().is_none());
        assert!(h.incidents.recv().await.is_some());
        assert!(h.outbox.try_recv().is_err());
    }
}
