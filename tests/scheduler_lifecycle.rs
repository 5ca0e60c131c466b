#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use async_trait::async_trait;
use minion::activity::{ActivityKind, ActivityPayload, ActivityTask, ChannelId, UserId};
use minion::handlers::{
    ActivityHandler, ActivityOutcome, HandlerContext, PlanningContext, fight_caves,
    standard_handlers,
};
use minion::notifier::{ChannelNotifier, Notifier, OutboundMessage};
use minion::scheduler::{
    Dispatcher, ManualClock, Resolution, Scheduler, SqliteTaskStore, TaskStore,
};
use minion::state::keys::{DAILY_DURATION, FIGHT_CAVES_ATTEMPTS, GEAR_RANGE};
use minion::state::{
    EconomyCategory, GearSetup, GearStats, InMemoryUserStore, Skill, UserStateStore, Weapon,
    WeaponClass, xp_for_level,
};
use minion::content::{StandardContent, items};
use minion::ActivityError;
use tokio::sync::mpsc;

struct Questing;

#[async_trait]
impl ActivityHandler for Questing {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Questing
    }

    async fn resolve(
        &self,
        task: &ActivityTask,
        _ctx: &mut HandlerContext,
    ) -> minion::Result<ActivityOutcome> {
        Ok(ActivityOutcome::message(format!(
            "{} finished questing",
            task.user_id
        )))
    }
}

struct BrokenNotifier;

#[async_trait]
impl Notifier for BrokenNotifier {
    async fn send(&self, _channel: &ChannelId, _message: OutboundMessage) -> anyhow::Result<()> {
        anyhow::bail!("channel deleted")
    }
}

fn ids(user: &str) -> (UserId, ChannelId) {
    (UserId::new(user), ChannelId::new(format!("{user}-channel")))
}

#[tokio::test]
async fn user_is_busy_until_resolution_then_free() {
    let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
    let state = Arc::new(InMemoryUserStore::new());
    let clock = Arc::new(ManualClock::new(10_000));
    let (notifier, mut outcomes) = ChannelNotifier::channel();
    let dispatcher = Dispatcher::new(store.clone(), state.clone(), Arc::new(notifier), clock.clone())
        .with_handler(Arc::new(Questing));
    let scheduler = Scheduler::new(store, clock.clone(), dispatcher);
    let (user, channel) = ids("alice");

    scheduler
        .enqueue(user.clone(), channel.clone(), ActivityPayload::Questing, 60_000, 1)
        .unwrap();
    let second = scheduler.enqueue(user.clone(), channel.clone(), ActivityPayload::Questing, 1_000, 1);
    assert!(matches!(second, Err(ActivityError::AlreadyBusy { .. })));

    clock.advance(59_999);
    assert!(scheduler.resolve_due().await.unwrap().is_empty());
    assert!(scheduler.is_busy(&user).unwrap());

    clock.advance(1);
    assert_eq!(
        scheduler.resolve_due().await.unwrap(),
        vec![Resolution::Completed]
    );
    assert!(!scheduler.is_busy(&user).unwrap());

    let (delivered_to, message) = outcomes.recv().await.unwrap();
    assert_eq!(delivered_to, channel);
    assert_eq!(message.text, "alice finished questing");
    assert_eq!(
        DAILY_DURATION.load(state.as_ref(), &user).await.unwrap(),
        60_000
    );

    scheduler
        .enqueue(user.clone(), channel, ActivityPayload::Questing, 1_000, 1)
        .unwrap();
    assert!(scheduler.is_busy(&user).unwrap());
}

#[tokio::test]
async fn concurrent_resolves_run_the_handler_once() {
    let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
    let clock = Arc::new(ManualClock::new(0));
    let (notifier, mut outcomes) = ChannelNotifier::channel();
    let dispatcher = Dispatcher::new(
        store.clone(),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(notifier),
        clock.clone(),
    )
    .with_handler(Arc::new(Questing));
    let scheduler = Scheduler::new(store, clock.clone(), dispatcher);
    let (user, channel) = ids("bob");

    scheduler
        .enqueue(user.clone(), channel, ActivityPayload::Questing, 5, 1)
        .unwrap();
    let task = scheduler.active_task(&user).unwrap().unwrap();
    clock.advance(5);

    let dispatcher = scheduler.dispatcher();
    let (a, b) = tokio::join!(dispatcher.resolve(task.clone()), dispatcher.resolve(task));
    let mut results = vec![a, b];
    results.sort_by_key(|r| *r == Resolution::Skipped);
    assert_eq!(results, vec![Resolution::Completed, Resolution::Skipped]);

    assert!(outcomes.recv().await.is_some());
    assert!(outcomes.try_recv().is_err());
}

#[tokio::test]
async fn notifier_failure_keeps_committed_outcome() {
    let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
    let state = Arc::new(InMemoryUserStore::new());
    let clock = Arc::new(ManualClock::new(0));
    let dispatcher = Dispatcher::new(store.clone(), state.clone(), Arc::new(BrokenNotifier), clock.clone())
        .with_handler(Arc::new(Questing));
    let scheduler = Scheduler::new(store, clock.clone(), dispatcher);
    let (user, channel) = ids("carol");

    scheduler
        .enqueue(user.clone(), channel, ActivityPayload::Questing, 100, 1)
        .unwrap();
    clock.advance(100);
    assert_eq!(
        scheduler.resolve_due().await.unwrap(),
        vec![Resolution::Completed]
    );
    assert!(!scheduler.is_busy(&user).unwrap());
    assert_eq!(DAILY_DURATION.load(state.as_ref(), &user).await.unwrap(), 100);
}

#[tokio::test]
async fn restart_rearms_pending_and_reports_interrupted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");
    let (alice, alice_channel) = ids("alice");
    let (bob, bob_channel) = ids("bob");

    let interrupted_id = {
        let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::open(&path).unwrap());
        let clock = Arc::new(ManualClock::new(1_000));
        let dispatcher = Dispatcher::new(
            store.clone(),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(ChannelNotifier::channel().0),
            clock.clone(),
        );
        let scheduler = Scheduler::new(store, clock, dispatcher);
        scheduler
            .enqueue(alice.clone(), alice_channel.clone(), ActivityPayload::Questing, 60_000, 1)
            .unwrap();
        scheduler
            .enqueue(bob.clone(), bob_channel, ActivityPayload::Questing, 10, 1)
            .unwrap();
        // Crash after claiming bob's task, before the handler finished.
        let task = scheduler.active_task(&bob).unwrap().unwrap();
        assert!(scheduler.dispatcher().claim(&task));
        task.id
    };

    let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::open(&path).unwrap());
    let clock = Arc::new(ManualClock::new(2_000));
    let (incident_tx, mut incidents) = mpsc::unbounded_channel();
    let (notifier, mut outcomes) = ChannelNotifier::channel();
    let dispatcher = Dispatcher::new(
        store.clone(),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(notifier),
        clock.clone(),
    )
    .with_handler(Arc::new(Questing))
    .with_incident_channel(incident_tx);
    let scheduler = Scheduler::new(store, clock.clone(), dispatcher);

    let report = scheduler.recover().unwrap();
    assert_eq!(report.rearmed, 1);
    assert_eq!(report.interrupted.len(), 1);
    assert_eq!(report.interrupted[0].task_id, interrupted_id);
    assert_eq!(report.interrupted[0].kind, ActivityKind::Questing.as_str());
    assert!(report.quarantined.is_empty());
    assert_eq!(incidents.recv().await.unwrap().task_id, interrupted_id);
    assert!(!scheduler.is_busy(&bob).unwrap());

    // The pending task keeps its original deadline.
    assert!(scheduler.is_busy(&alice).unwrap());
    clock.set(61_000);
    assert_eq!(
        scheduler.resolve_due().await.unwrap(),
        vec![Resolution::Completed]
    );
    let (channel, _) = outcomes.recv().await.unwrap();
    assert_eq!(channel, alice_channel);
    assert!(!scheduler.is_busy(&alice).unwrap());
}

#[tokio::test]
async fn undecodable_record_is_quarantined_without_stalling_others() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");
    let (alice, alice_channel) = ids("alice");
    let (bob, _) = ids("bob");

    {
        let store = SqliteTaskStore::open(&path).unwrap();
        let clock = Arc::new(ManualClock::new(1_000));
        let store: Arc<dyn TaskStore> = Arc::new(store);
        let dispatcher = Dispatcher::new(
            store.clone(),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(ChannelNotifier::channel().0),
            clock.clone(),
        );
        Scheduler::new(store, clock, dispatcher)
            .enqueue(alice.clone(), alice_channel.clone(), ActivityPayload::Questing, 500, 1)
            .unwrap();
    }
    // A record written by a build that knew an activity this one does not.
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute(
            "INSERT INTO activity_tasks \
             (id, user_id, channel_id, kind, payload, enqueue_time, duration_ms, finish_time) \
             VALUES ('legacy', 'bob', 'bob-channel', 'questing', \
                     '{\"type\":\"no_such_kind\"}', 1000, 100, 1100)",
            [],
        )
        .unwrap();

    let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::open(&path).unwrap());
    let clock = Arc::new(ManualClock::new(1_200));
    let (incident_tx, mut incidents) = mpsc::unbounded_channel();
    let (notifier, mut outcomes) = ChannelNotifier::channel();
    let dispatcher = Dispatcher::new(
        store.clone(),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(notifier),
        clock.clone(),
    )
    .with_handler(Arc::new(Questing))
    .with_incident_channel(incident_tx);
    let scheduler = Scheduler::new(store, clock.clone(), dispatcher);

    let report = scheduler.recover().unwrap();
    assert_eq!(report.rearmed, 1);
    assert_eq!(report.quarantined.len(), 1);
    let incident = incidents.recv().await.unwrap();
    assert_eq!(incident.task_id.as_str(), "legacy");
    assert_eq!(incident.user_id, bob);
    assert_eq!(incident.kind, "questing");
    assert_eq!(incident.payload["type"], "no_such_kind");
    assert!(incident.error.contains("no_such_kind"), "{}", incident.error);
    assert!(!scheduler.is_busy(&bob).unwrap());

    clock.set(1_500);
    assert_eq!(
        scheduler.resolve_due().await.unwrap(),
        vec![Resolution::Completed]
    );
    let (channel, message) = outcomes.recv().await.unwrap();
    assert_eq!(channel, alice_channel);
    assert_eq!(message.text, "alice finished questing");
    assert!(outcomes.try_recv().is_err());
    assert!(incidents.try_recv().is_err());
}

#[tokio::test]
async fn fight_caves_trip_round_trip() {
    let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
    let state = Arc::new(InMemoryUserStore::new());
    let clock = Arc::new(ManualClock::new(0));
    let (notifier, mut outcomes) = ChannelNotifier::channel();
    let dispatcher = Dispatcher::new(store.clone(), state.clone(), Arc::new(notifier), clock.clone())
        .with_handlers(standard_handlers())
        .with_rng(Arc::new(minion::rng::SeededRng::new(11)));
    let scheduler = Scheduler::new(store, clock.clone(), dispatcher);
    let content = StandardContent::new();
    let (user, channel) = ids("dave");

    state
        .add_xp(&user, Skill::Prayer, xp_for_level(43))
        .await
        .unwrap();
    state
        .add_to_bank(&user, &fight_caves::supplies())
        .await
        .unwrap();
    GEAR_RANGE
        .store(
            state.as_ref(),
            &user,
            &GearSetup {
                weapon: Some(Weapon {
                    item: items::RUNE_CROSSBOW,
                    class: WeaponClass::Crossbow,
                }),
                equipped: vec![items::RUNE_CROSSBOW],
                stats: GearStats {
                    attack_ranged: 236,
                    ..GearStats::default()
                },
            },
        )
        .await
        .unwrap();

    let planning = PlanningContext {
        scheduler: &scheduler,
        state: state.as_ref(),
        content: &content,
    };
    let mut rng = minion::rng::ScriptedRandom::new([0.5]);
    let trip = fight_caves::start_trip(&planning, &mut rng, &user, &channel)
        .await
        .unwrap();
    assert!(state.bank(&user).await.unwrap().is_empty());
    assert_eq!(
        state.economy_total(EconomyCategory::FightCavesCost).await,
        fight_caves::supplies()
    );
    assert_eq!(trip.handle.kind, ActivityKind::FightCaves);
    assert!(scheduler.is_busy(&user).unwrap());

    clock.advance(trip.duration_ms);
    assert_eq!(
        scheduler.resolve_due().await.unwrap(),
        vec![Resolution::Completed]
    );
    assert_eq!(
        FIGHT_CAVES_ATTEMPTS.load(state.as_ref(), &user).await.unwrap(),
        1
    );
    let bank = state.bank(&user).await.unwrap();
    assert!(bank.has(items::TOKKUL, 1) || trip.payload.pre_jad_death_time.is_some());
    let (delivered_to, _) = outcomes.recv().await.unwrap();
    assert_eq!(delivered_to, channel);
}
