//! Headless simulation driver.
//!
//! Plays one simulated user through Fight Caves attempts until a Fire cape
//! drops, then runs two farming cycles, advancing a manual clock instead of
//! waiting in real time. Usage: `minion-sim [config.toml]`.

use std::path::PathBuf;
use std::sync::Arc;

use minion::activity::{ChannelId, CompostTier, PatchKind, UserId};
use minion::content::{ContentTables, StandardContent, items};
use minion::handlers::farming::{self, CycleRequest};
use minion::handlers::{PlanningContext, fight_caves, standard_handlers};
use minion::notifier::{ChannelNotifier, OutboundMessage};
use minion::rng::{RngProvider, provider_from_seed};
use minion::scheduler::clock::now_epoch_millis;
use minion::scheduler::{
    Clock, Dispatcher, ManualClock, Scheduler, SqliteTaskStore, TaskStore,
};
use minion::state::keys::{GEAR_RANGE, MINION_NAME};
use minion::state::{
    GearSetup, GearStats, InMemoryUserStore, LootBundle, Skill, UserStateStore, Weapon,
    WeaponClass, xp_for_level,
};
use minion::MinionConfig;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MAX_ATTEMPTS: u32 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(MinionConfig::default_config_path);
    let config = MinionConfig::load_or_default(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    let db_path = config.scheduler.effective_database_path();
    info!(path = %db_path.display(), "opening task database");
    let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::from_config(&config.scheduler)?);
    let state = Arc::new(InMemoryUserStore::new());
    let clock = Arc::new(ManualClock::new(now_epoch_millis()));
    let content = StandardContent::new();
    let rng: Arc<dyn RngProvider> = Arc::from(provider_from_seed(config.rng.seed));
    let (notifier, mut outcomes) = ChannelNotifier::channel();

    let dispatcher = Dispatcher::new(store.clone(), state.clone(), Arc::new(notifier), clock.clone())
        .with_handlers(standard_handlers())
        .with_rng(rng.clone())
        .with_io_timeout(config.scheduler.io_timeout());
    let scheduler =
        Scheduler::new(store, clock.clone(), dispatcher).with_max_idle(config.scheduler.max_idle());

    let report = scheduler.recover()?;
    for incident in &report.interrupted {
        println!("interrupted task {} ({})", incident.task_id, incident.kind);
    }
    for incident in &report.quarantined {
        println!("quarantined task {} ({}): {}", incident.task_id, incident.kind, incident.error);
    }

    let user = UserId::new("sim-user");
    let channel = ChannelId::new("sim-channel");
    if let Some(task) = scheduler.active_task(&user)? {
        clock.set(task.finish_time.max(clock.now_ms()));
        scheduler.resolve_due().await?;
        print_outcomes(&mut outcomes);
    }
    prepare_user(state.as_ref(), &user).await?;

    let planning = PlanningContext {
        scheduler: &scheduler,
        state: state.as_ref(),
        content: &content,
    };
    let mut planning_rng = rng.source();

    println!("== Fight Caves ==\n");
    for attempt in 1..=MAX_ATTEMPTS {
        state
            .add_to_bank(&user, &fight_caves::supplies())
            .await?;
        let trip =
            fight_caves::start_trip(&planning, planning_rng.as_mut(), &user, &channel).await?;
        println!("Attempt {attempt}:\n{}\n", trip.message);
        clock.advance(trip.duration_ms);
        scheduler.resolve_due().await?;
        print_outcomes(&mut outcomes);
        if state.bank(&user).await?.has(items::FIRE_CAPE, 1) {
            info!(attempt, "fire cape obtained");
            break;
        }
    }

    println!("== Farming ==\n");
    let guam = content
        .plant("Guam")
        .ok_or_else(|| anyhow::anyhow!("content table has no Guam"))?;
    let growth_ms = guam.growth_time_ms;
    let requests = [
        CycleRequest::Plant {
            plant_name: guam.name.clone(),
            quantity: 4,
            compost: Some(CompostTier::Compost),
            pay: false,
        },
        CycleRequest::Plant {
            plant_name: guam.name.clone(),
            quantity: 4,
            compost: Some(CompostTier::Compost),
            pay: false,
        },
        CycleRequest::Harvest {
            patch: PatchKind::Herb,
        },
    ];
    for (i, request) in requests.into_iter().enumerate() {
        if i > 0 {
            clock.advance(growth_ms);
        }
        let cycle = farming::plan_cycle(&planning, &user, &channel, request).await?;
        println!("{}\n", cycle.message);
        clock.advance(cycle.duration_ms);
        scheduler.resolve_due().await?;
        print_outcomes(&mut outcomes);
    }

    let bank = state.bank(&user).await?;
    println!("Final bank: {} item kinds", bank.len());
    for (item, quantity) in bank.iter() {
        println!("  {quantity}x {}", content.item_name(item));
    }
    Ok(())
}

/// Give the simulated user everything both activities require.
async fn prepare_user(state: &InMemoryUserStore, user: &UserId) -> anyhow::Result<()> {
    MINION_NAME
        .store(state, user, &Some("Sim".to_owned()))
        .await?;
    state
        .add_xp(user, Skill::Prayer, xp_for_level(70))
        .await?;
    state
        .add_xp(user, Skill::Farming, xp_for_level(50))
        .await?;
    GEAR_RANGE
        .store(
            state,
            user,
            &GearSetup {
                weapon: Some(Weapon {
                    item: items::RUNE_CROSSBOW,
                    class: WeaponClass::Crossbow,
                }),
                equipped: vec![items::RUNE_CROSSBOW],
                stats: GearStats {
                    attack_ranged: 190,
                    ..GearStats::default()
                },
            },
        )
        .await?;
    state
        .add_to_bank(
            user,
            &LootBundle::from([(items::GUAM_SEED, 8), (items::COMPOST, 8)]),
        )
        .await?;
    Ok(())
}

fn print_outcomes(outcomes: &mut UnboundedReceiver<(ChannelId, OutboundMessage)>) {
    while let Ok((channel, message)) = outcomes.try_recv() {
        println!("[{channel}] {}\n", message.text);
    }
}
