//! Fight Caves: trip planning and resolution.
//!
//! Every chance that can be rolled before the trip starts is rolled by
//! [`start_trip`] and stored in the payload; the handler only rolls the
//! TzTok-Jad fight itself and the pet.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::activity::{
    ActivityKind, ActivityPayload, ActivityTask, ChannelId, FightCavesPayload, TaskHandle, UserId,
};
use crate::content::{items, monsters};
use crate::error::{ActivityError, Result};
use crate::handlers::{
    ActivityHandler, ActivityOutcome, HandlerContext, PlanningContext, enqueue_paid,
    format_duration, minion_name, readable_items,
};
use crate::rng::{RandomSource, percent_chance, roll};
use crate::state::keys::{self, FIGHT_CAVES_ATTEMPTS, GEAR_RANGE};
use crate::state::{EconomyCategory, GearSlot, LootBundle, Skill};

const MINUTE_MS: u64 = 60 * 1000;
const HOUR_MS: u64 = 60 * MINUTE_MS;

/// Trip length before any reduction.
pub const BASE_DURATION_MS: u64 = 2 * HOUR_MS;
/// Ranged attack bonus treated as 100% for the gear reduction.
pub const REFERENCE_RANGED_BONUS: f64 = 236.0;
/// Lowest ranged attack bonus accepted for a trip.
pub const MIN_RANGED_BONUS: i32 = 160;
/// Protection prayers are required to face TzTok-Jad.
pub const MIN_PRAYER_LEVEL: u8 = 43;
/// Earliest point of a trip at which a pre-boss death can happen.
pub const EARLIEST_DEATH_MS: u64 = 20 * MINUTE_MS;

/// Consolation Tokkul for reaching TzTok-Jad and dying.
pub const TOKKUL_ON_JAD_DEATH: u64 = 8_032;
pub const TOKKUL_ON_COMPLETION: u64 = 16_064;
/// TzRek-Jad odds on a completed run.
pub const PET_ONE_IN: u64 = 200;

/// Consumables taken from the bank for every attempt.
pub fn supplies() -> LootBundle {
    LootBundle::from([
        (items::PRAYER_POTION_4, 10),
        (items::SARADOMIN_BREW_4, 6),
        (items::SUPER_RESTORE_4, 4),
    ])
}

/// Percent chance of dying before TzTok-Jad.
pub fn pre_jad_death_chance(attempts: u32, has_saradomin_godsword: bool) -> u32 {
    let base = (14 - 2 * i64::from(attempts)).max(5);
    let chance = if has_saradomin_godsword { base - 4 } else { base };
    chance as u32
}

/// Percent chance of dying to TzTok-Jad, falling from 99 towards 5 with practice.
pub fn jad_death_chance(attempts: u32) -> u32 {
    if attempts == 0 {
        return 99;
    }
    let learned = f64::from(attempts).ln() / 15f64.sqrt().ln() * 50.0;
    (100.0 - learned).floor().clamp(5.0, 99.0) as u32
}

/// Percent chance of surviving both stages.
pub fn survival_chance(pre_jad_death_chance: u32, jad_death_chance: u32) -> f64 {
    f64::from(100 - pre_jad_death_chance.min(100)) * f64::from(100 - jad_death_chance.min(100))
        / 100.0
}

/// Trip length after experience and gear reductions, before jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripDuration {
    pub duration_ms: u64,
    /// One percent per TzTok-Jad kill, up to 50.
    pub kc_reduction_pct: f64,
    /// Half the ranged bonus as a percentage of the reference, up to 50.
    pub gear_reduction_pct: f64,
}

impl TripDuration {
    /// Boost line shown when the trip starts.
    pub fn boosts(&self) -> String {
        format!(
            "{}% from KC, {}% from Gear",
            self.kc_reduction_pct, self.gear_reduction_pct
        )
    }
}

/// Shorten [`BASE_DURATION_MS`] by kill count, then by ranged gear.
///
/// Both reductions are applied in turn to the remaining duration.
pub fn trip_duration(jad_kc: u32, ranged_attack_bonus: i32) -> TripDuration {
    let mut duration = BASE_DURATION_MS as f64;

    let kc_reduction_pct = f64::from(jad_kc.min(50));
    duration -= duration * kc_reduction_pct / 100.0;

    let bonus_pct = f64::from(ranged_attack_bonus.max(0)) / REFERENCE_RANGED_BONUS * 100.0;
    let gear_reduction_pct = (bonus_pct.floor() / 2.0).min(50.0);
    duration -= duration * gear_reduction_pct / 100.0;

    TripDuration {
        duration_ms: duration.floor() as u64,
        kc_reduction_pct,
        gear_reduction_pct,
    }
}

/// Lengthen `duration_ms` by `jitter_pct` percent (1 to 5).
pub fn apply_jitter(duration_ms: u64, jitter_pct: u64) -> u64 {
    duration_ms + jitter_pct * duration_ms / 100
}

/// What the player sees when a trip starts.
#[derive(Debug, Clone)]
pub struct TripSummary {
    pub handle: TaskHandle,
    /// Chances and pre-rolled death time stored with the task.
    pub payload: FightCavesPayload,
    /// Jittered trip length.
    pub duration_ms: u64,
    /// Supplies taken from the bank.
    pub removed: LootBundle,
    pub message: String,
}

async fn saradomin_godsword_equipped(ctx: &PlanningContext<'_>, user: &UserId) -> Result<bool> {
    for slot in GearSlot::ALL {
        let setup = keys::gear(slot).load(ctx.state, user).await?;
        if setup.has_equipped(items::SARADOMIN_GODSWORD) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Check requirements, take supplies and enqueue a Fight Caves attempt.
///
/// Requirement failures are [`ActivityError::Validation`] narratives and
/// leave the bank untouched.
pub async fn start_trip(
    ctx: &PlanningContext<'_>,
    rng: &mut dyn RandomSource,
    user: &UserId,
    channel: &ChannelId,
) -> Result<TripSummary> {
    let range = GEAR_RANGE.load(ctx.state, user).await?;
    let cost = supplies();

    if !range
        .weapon
        .as_ref()
        .is_some_and(|weapon| weapon.class.is_ranged_launcher())
    {
        return Err(ActivityError::Validation(
            "JalYt, you not wearing ranged weapon?! TzTok-Jad stomp you to death if you get \
             close, come back with range weapon."
                .to_owned(),
        ));
    }
    let ranged_bonus = range.stats.attack_ranged;
    if ranged_bonus < MIN_RANGED_BONUS {
        return Err(ActivityError::Validation(
            "JalYt, your ranged gear not strong enough! You die very quickly with your bad \
             gear, come back with better range gear."
                .to_owned(),
        ));
    }
    if !ctx.state.bank(user).await?.has_all(&cost) {
        return Err(ActivityError::Validation(format!(
            "JalYt, you need supplies to have a chance in the caves...come back with {}.",
            readable_items(ctx.content, &cost)
        )));
    }
    if ctx.state.skill_level(user, Skill::Prayer).await? < MIN_PRAYER_LEVEL {
        return Err(ActivityError::Validation(format!(
            "JalYt, come back when you have atleast {MIN_PRAYER_LEVEL} Prayer, TzTok-Jad \
             annihilate you without protection from gods."
        )));
    }
    if ctx.scheduler.is_busy(user)? {
        return Err(ActivityError::AlreadyBusy {
            user_id: user.clone(),
        });
    }

    let attempts = FIGHT_CAVES_ATTEMPTS.load(ctx.state, user).await?;
    let jad_kc = ctx.state.kill_count(user, monsters::TZTOK_JAD).await?;
    let has_sgs = saradomin_godsword_equipped(ctx, user).await?;

    let planned = trip_duration(jad_kc, ranged_bonus);
    let duration_ms = apply_jitter(planned.duration_ms, rng.int_inclusive(1, 5));
    let jad_chance = jad_death_chance(attempts);
    let pre_jad_chance = pre_jad_death_chance(attempts, has_sgs);
    let pre_jad_death_time = percent_chance(rng, f64::from(pre_jad_chance))
        .then(|| rng.int_inclusive(EARLIEST_DEATH_MS, duration_ms));

    let payload = FightCavesPayload {
        jad_death_chance: jad_chance,
        pre_jad_death_chance: pre_jad_chance,
        pre_jad_death_time,
    };

    ctx.state.remove_from_bank(user, &cost).await?;
    let handle = enqueue_paid(
        ctx,
        user,
        channel,
        ActivityPayload::FightCaves(payload.clone()),
        duration_ms,
        1,
        &cost,
    )
    .await?;
    if let Err(e) = ctx
        .state
        .record_economy_cost(EconomyCategory::FightCavesCost, &cost)
        .await
    {
        warn!(task_id = %handle.id, "cannot record fight caves economy cost: {e}");
    }

    let message = format!(
        "**Duration:** {} ({:.2} minutes)\n\
         **Boosts:** {}\n\
         **Range Attack Bonus:** {ranged_bonus}\n\
         **Jad KC:** {jad_kc}\n\
         **Attempts:** {attempts}\n\n\
         **Removed from your bank:** {}\n\n\
         You're on your own now JalYt, prepare to fight for your life! I think you have \
         {:.1}% chance of survival.",
        format_duration(duration_ms),
        duration_ms as f64 / 1000.0 / 60.0,
        planned.boosts(),
        readable_items(ctx.content, &cost),
        survival_chance(pre_jad_chance, jad_chance),
    );

    Ok(TripSummary {
        handle,
        payload,
        duration_ms,
        removed: cost,
        message,
    })
}

/// Resolves [`ActivityKind::FightCaves`] tasks.
#[derive(Debug, Default, Clone, Copy)]
pub struct FightCavesHandler;

#[async_trait]
impl ActivityHandler for FightCavesHandler {
    fn kind(&self) -> ActivityKind {
        ActivityKind::FightCaves
    }

    async fn resolve(
        &self,
        task: &ActivityTask,
        ctx: &mut HandlerContext,
    ) -> Result<ActivityOutcome> {
        let ActivityPayload::FightCaves(payload) = &task.payload else {
            return Err(ActivityError::HandlerFault {
                task_id: task.id.clone(),
                message: format!("fight caves handler received a {} payload", task.kind),
            });
        };
        let user = &task.user_id;
        let state = ctx.state.as_ref();

        let attempts = FIGHT_CAVES_ATTEMPTS.load(state, user).await? + 1;
        FIGHT_CAVES_ATTEMPTS.store(state, user, &attempts).await?;
        let name = minion_name(state, task).await?;

        if let Some(died_at) = payload.pre_jad_death_time {
            debug!(task_id = %task.id, died_at, "died before TzTok-Jad");
            return Ok(ActivityOutcome {
                message: format!(
                    "{name} died {} into their Fight Caves attempt, before reaching TzTok-Jad. \
                     The supplies were used up. This was attempt {attempts}.",
                    format_duration(died_at)
                ),
                effective_duration_ms: Some(died_at),
                ..ActivityOutcome::default()
            });
        }

        if percent_chance(ctx.rng.as_mut(), f64::from(payload.jad_death_chance)) {
            let loot = LootBundle::from([(items::TOKKUL, TOKKUL_ON_JAD_DEATH)]);
            state.add_to_bank(user, &loot).await?;
            return Ok(ActivityOutcome::message(format!(
                "{name} made it through every wave but was killed by TzTok-Jad. \
                 You received {TOKKUL_ON_JAD_DEATH} Tokkul. This was attempt {attempts}."
            )));
        }

        let mut loot = LootBundle::from([
            (items::FIRE_CAPE, 1),
            (items::TOKKUL, TOKKUL_ON_COMPLETION),
        ]);
        let got_pet = roll(ctx.rng.as_mut(), PET_ONE_IN);
        if got_pet {
            loot.add(items::TZREK_JAD, 1);
        }
        state.add_to_bank(user, &loot).await?;
        let kc = state
            .increment_kill_count(user, monsters::TZTOK_JAD, 1)
            .await?;

        let mut message = format!(
            "{name} defeated TzTok-Jad on attempt {attempts}! Your TzTok-Jad KC is now {kc}. \
             You received {}.",
            readable_items(ctx.content.as_ref(), &loot)
        );
        if got_pet {
            message.push_str(" You have a funny feeling you're being followed...");
        }
        Ok(ActivityOutcome::message(message))
    }
}
