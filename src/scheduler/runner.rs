//! Scheduler background loop.
//!
//! Accepts new tasks, persists them and wakes at the earliest deadline to
//! hand due tasks to the [`Dispatcher`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::activity::{ActivityPayload, ActivityTask, ChannelId, TaskHandle, UserId};
use crate::error::{ActivityError, Result};
use crate::scheduler::clock::Clock;
use crate::scheduler::dispatch::{Dispatcher, Incident, Resolution};
use crate::scheduler::store::TaskStore;

/// Default upper bound on the sleep between deadline checks.
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_millis(1000);

/// What [`Scheduler::recover`] found after a restart.
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    /// Pending tasks that will resolve at their original deadlines.
    pub rearmed: usize,
    /// Tasks interrupted mid-resolution, retired without replay.
    pub interrupted: Vec<Incident>,
    /// Records that could not be decoded, removed and reported.
    pub quarantined: Vec<Incident>,
}

/// Single logical scheduler. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<Dispatcher>,
    wake: Arc<Notify>,
    max_idle: Duration,
}

impl Scheduler {
    /// Scheduler over `store`, resolving through `dispatcher`.
    ///
    /// Nothing runs until [`run`](Self::run) is spawned or due tasks are
    /// resolved by hand.
    pub fn new(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock>, dispatcher: Dispatcher) -> Self {
        Self {
            store,
            clock,
            dispatcher: Arc::new(dispatcher),
            wake: Arc::new(Notify::new()),
            max_idle: DEFAULT_MAX_IDLE,
        }
    }

    /// Upper bound on the sleep between deadline checks, at least 1 ms.
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle.max(Duration::from_millis(1));
        self
    }

    /// The dispatcher shared by every clone of this scheduler.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Current time on the scheduler's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Persist a new task for `user_id` finishing `duration_ms` from now.
    ///
    /// Fails with [`ActivityError::AlreadyBusy`] if the user has an
    /// unresolved task, and with a validation error for a zero duration.
    pub fn enqueue(
        &self,
        user_id: UserId,
        channel_id: ChannelId,
        payload: ActivityPayload,
        duration_ms: u64,
        quantity: u32,
    ) -> Result<TaskHandle> {
        if duration_ms == 0 {
            return Err(ActivityError::Validation(
                "An activity needs a duration greater than zero.".to_owned(),
            ));
        }
        let task = ActivityTask::new(
            user_id,
            channel_id,
            payload,
            self.clock.now_ms(),
            duration_ms,
            quantity,
        );
        self.store.insert(&task)?;
        info!(
            task_id = %task.id,
            user_id = %task.user_id,
            kind = %task.kind,
            finish = ?task.finish_date(),
            "activity enqueued"
        );
        self.wake.notify_one();
        Ok(task.handle())
    }

    /// The user's unresolved task, if any.
    pub fn active_task(&self, user_id: &UserId) -> Result<Option<ActivityTask>> {
        self.store.active_for_user(user_id)
    }

    /// Whether the user has a pending or resolving task.
    pub fn is_busy(&self, user_id: &UserId) -> Result<bool> {
        Ok(self.active_task(user_id)?.is_some())
    }

    /// Re-arm persisted work after a restart.
    ///
    /// Pending tasks keep their deadlines. Tasks caught mid-resolution are
    /// retired and reported instead of being resolved a second time.
    /// Records that no longer decode are removed and reported without
    /// stopping the rest from being re-armed.
    pub fn recover(&self) -> Result<RecoveryReport> {
        let interrupted = self.dispatcher.recover_interrupted()?;
        let rearmed = self.store.pending()?.len();
        let quarantined = self.dispatcher.report_quarantined();
        info!(
            rearmed,
            interrupted = interrupted.len(),
            quarantined = quarantined.len(),
            "scheduler recovered persisted tasks"
        );
        self.wake.notify_one();
        Ok(RecoveryReport {
            rearmed,
            interrupted,
            quarantined,
        })
    }

    /// Claim every due task and spawn one resolution per task.
    pub fn dispatch_due(&self) -> Result<Vec<JoinHandle<Resolution>>> {
        let now = self.clock.now_ms();
        let due = self.store.due(now)?;
        self.dispatcher.report_quarantined();
        let mut handles = Vec::new();
        for task in due {
            if !self.dispatcher.claim(&task) {
                continue;
            }
            let dispatcher = self.dispatcher.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.resolve_claimed(task).await
            }));
        }
        if !handles.is_empty() {
            debug!(count = handles.len(), "dispatched due tasks");
        }
        Ok(handles)
    }

    /// [`dispatch_due`](Self::dispatch_due), then wait for every resolution.
    pub async fn resolve_due(&self) -> Result<Vec<Resolution>> {
        let mut resolutions = Vec::new();
        for handle in self.dispatch_due()? {
            match handle.await {
                Ok(resolution) => resolutions.push(resolution),
                Err(e) => {
                    error!("resolution task failed to join: {e}");
                    resolutions.push(Resolution::Faulted);
                }
            }
        }
        Ok(resolutions)
    }

    /// Spawn the scheduler loop. It stops when `cancel` fires; in-flight
    /// resolutions run to completion.
    pub fn run(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            info!("activity scheduler started");
            loop {
                if let Err(e) = this.dispatch_due() {
                    warn!("cannot load due tasks: {e}");
                }
                let idle = this.idle_duration();
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = this.wake.notified() => {}
                    _ = tokio::time::sleep(idle) => {}
                }
            }
            info!("activity scheduler stopped");
        })
    }

    /// Time until the next deadline, bounded by `max_idle`.
    fn idle_duration(&self) -> Duration {
        match self.store.next_deadline() {
            Ok(Some(deadline)) => {
                let wait = deadline.saturating_sub(self.clock.now_ms());
                Duration::from_millis(wait).min(self.max_idle)
            }
            Ok(None) => self.max_idle,
            Err(e) => {
                warn!("cannot read next deadline: {e}");
                self.max_idle
            }
        }
    }
}
