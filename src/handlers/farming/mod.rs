//! Farming: cycle planning and resolution.
//!
//! A cycle either plants an empty patch, or harvests the crop planted by
//! the previous cycle (optionally replanting in the same trip). The patch
//! state carried in the payload is the snapshot taken when the cycle was
//! planned; the handler writes the new state once the outcome is committed.

pub mod simulate;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::activity::{
    ActivityKind, ActivityPayload, ActivityTask, ChannelId, CompostTier, FarmingPayload,
    PatchKind, PatchState, TaskHandle, UserId,
};
use crate::content::{ContentTables, Plant, SeedType, YieldModel, items, monsters};
use crate::error::{ActivityError, Result};
use crate::handlers::{
    ActivityHandler, ActivityOutcome, HandlerContext, PlanningContext, enqueue_paid,
    format_duration, minion_name, readable_items,
};
use crate::rng::{RandomSource, roll};
use crate::state::keys::{FARMING_CONTRACT, FarmingContract, farming_patch};
use crate::state::{EconomyCategory, LootBundle, Skill, UserStateStore};

use simulate::{
    count_deaths, death_reduction, harvest_bonus, lives_yield, outfit_multiplier, pet_one_in,
    save_chance, starting_lives,
};

const SECOND_MS: u64 = 1000;

/// Per-patch time spent travelling to and planting a patch.
pub const PLANT_TIME_MS: u64 = 20 * SECOND_MS;
/// Extra per-patch time when the old crop is harvested first.
pub const HARVEST_TIME_MS: u64 = 10 * SECOND_MS;
/// Extra per-patch time for applying compost.
pub const COMPOST_TIME_MS: u64 = 5 * SECOND_MS;

/// Raking XP per patch: four XP for each of three weeds.
pub const RAKE_XP_PER_PATCH: f64 = 12.0;
/// Weeds banked for each raked patch.
pub const WEEDS_PER_PATCH: u64 = 3;
/// Coins paid per living tree when the minion cannot chop it down.
pub const TREE_CLEARING_FEE: u64 = 200;

/// A request to start a farming trip.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleRequest {
    /// Plant `quantity` seeds, harvesting whatever the patch already holds.
    Plant {
        plant_name: String,
        quantity: u32,
        /// Compost applied to every planted patch.
        compost: Option<CompostTier>,
        /// Pay a gardener to protect the crop.
        pay: bool,
    },
    /// Harvest a patch without replanting.
    Harvest { patch: PatchKind },
}

/// What the player sees when a cycle starts.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub handle: TaskHandle,
    pub duration_ms: u64,
    /// Seeds, compost and payment taken from the bank.
    pub removed: LootBundle,
    pub message: String,
}

fn patch_label(kind: PatchKind) -> String {
    kind.setting_name()
        .trim_start_matches("farmingPatches.")
        .replace('_', " ")
}

/// Cycle length for `patches` patches.
pub fn cycle_duration(patches: u32, harvesting: bool, composting: bool) -> u64 {
    let mut per_patch = PLANT_TIME_MS;
    if harvesting {
        per_patch += HARVEST_TIME_MS;
    }
    if composting {
        per_patch += COMPOST_TIME_MS;
    }
    u64::from(patches.max(1)) * per_patch
}

/// Reject a harvest of a crop that is still growing.
fn ensure_grown(
    content: &dyn ContentTables,
    patch: PatchKind,
    state: &PatchState,
    now_ms: u64,
) -> Result<()> {
    if !state.is_harvestable {
        return Ok(());
    }
    let growth = state
        .last_planted
        .as_deref()
        .and_then(|name| content.plant(name))
        .map_or(0, |plant| plant.growth_time_ms);
    let ready_at = state.planted_at_ms.saturating_add(growth);
    if now_ms < ready_at {
        return Err(ActivityError::Validation(format!(
            "Your {} patches are still growing. Come back in {}.",
            patch_label(patch),
            format_duration(ready_at - now_ms)
        )));
    }
    Ok(())
}

/// Check requirements, take seeds and compost, and enqueue a farming cycle.
pub async fn plan_cycle(
    ctx: &PlanningContext<'_>,
    user: &UserId,
    channel: &ChannelId,
    request: CycleRequest,
) -> Result<CycleSummary> {
    let now = ctx.scheduler.now_ms();
    match request {
        CycleRequest::Plant {
            plant_name,
            quantity,
            compost,
            pay,
        } => {
            let plant = ctx.content.plant(&plant_name).ok_or_else(|| {
                ActivityError::Validation(format!("There is no plant called {plant_name}."))
            })?;
            if quantity == 0 {
                return Err(ActivityError::Validation(
                    "You need to plant at least one seed.".to_owned(),
                ));
            }
            let level = ctx.state.skill_level(user, Skill::Farming).await?;
            if level < plant.level {
                return Err(ActivityError::Validation(format!(
                    "You need {} Farming to plant {}.",
                    plant.level, plant.name
                )));
            }
            if pay && plant.protection_payment.is_none() {
                return Err(ActivityError::Validation(format!(
                    "No gardener will protect {} patches.",
                    plant.name
                )));
            }
            if ctx.scheduler.is_busy(user)? {
                return Err(ActivityError::AlreadyBusy {
                    user_id: user.clone(),
                });
            }

            let patch_state = farming_patch(plant.patch).load(ctx.state, user).await?;
            ensure_grown(ctx.content, plant.patch, &patch_state, now)?;

            let mut cost = LootBundle::from([(plant.seed, u64::from(quantity))]);
            if let Some(tier) = compost {
                cost.add(tier.item(), u64::from(quantity));
            }
            if let (true, Some((item, per_patch))) = (pay, plant.protection_payment) {
                cost.add(item, per_patch * u64::from(quantity));
            }
            let bank = ctx.state.bank(user).await?;
            if !bank.has_all(&cost) {
                return Err(ActivityError::Validation(format!(
                    "You don't have enough items. You are missing {}.",
                    readable_items(ctx.content, &bank.shortfall(&cost))
                )));
            }

            let harvesting = patch_state.is_harvestable;
            let duration_ms = cycle_duration(quantity, harvesting, compost.is_some());
            let payload = FarmingPayload {
                plant_name: Some(plant.name.clone()),
                patch: plant.patch,
                patch_state: patch_state.clone(),
                quantity,
                upgrade_tier: compost,
                pay,
                planting: true,
            };

            ctx.state.remove_from_bank(user, &cost).await?;
            let handle = enqueue_paid(
                ctx,
                user,
                channel,
                ActivityPayload::Farming(payload),
                duration_ms,
                quantity,
                &cost,
            )
            .await?;
            if let Err(e) = ctx
                .state
                .record_economy_cost(EconomyCategory::FarmingCost, &cost)
                .await
            {
                warn!(task_id = %handle.id, "cannot record farming economy cost: {e}");
            }

            let mut message = match patch_state.last_planted.as_deref() {
                Some(old) if harvesting => format!(
                    "Your minion is now harvesting {}x {old} and then planting {quantity}x {}.",
                    patch_state.last_quantity, plant.name
                ),
                _ => format!("Your minion is now planting {quantity}x {}.", plant.name),
            };
            message.push_str(&format!(
                " It'll take around {} to finish.\n\nRemoved from your bank: {}.",
                format_duration(duration_ms),
                readable_items(ctx.content, &cost)
            ));
            Ok(CycleSummary {
                handle,
                duration_ms,
                removed: cost,
                message,
            })
        }
        CycleRequest::Harvest { patch } => {
            let patch_state = farming_patch(patch).load(ctx.state, user).await?;
            let Some(planted) = patch_state
                .last_planted
                .clone()
                .filter(|_| patch_state.is_harvestable)
            else {
                return Err(ActivityError::Validation(format!(
                    "There is nothing growing in your {} patches.",
                    patch_label(patch)
                )));
            };
            ensure_grown(ctx.content, patch, &patch_state, now)?;
            if ctx.scheduler.is_busy(user)? {
                return Err(ActivityError::AlreadyBusy {
                    user_id: user.clone(),
                });
            }

            let quantity = patch_state.last_quantity;
            let duration_ms = cycle_duration(quantity, true, false);
            let payload = FarmingPayload {
                plant_name: None,
                patch,
                patch_state,
                quantity: 0,
                upgrade_tier: None,
                pay: false,
                planting: false,
            };
            let handle = ctx.scheduler.enqueue(
                user.clone(),
                channel.clone(),
                ActivityPayload::Farming(payload),
                duration_ms,
                quantity,
            )?;
            Ok(CycleSummary {
                handle,
                duration_ms,
                removed: LootBundle::new(),
                message: format!(
                    "Your minion is now harvesting {quantity}x {planted}. It'll take around {} \
                     to finish.",
                    format_duration(duration_ms)
                ),
            })
        }
    }
}

/// Everything rolled for one harvest, before any of it is committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestResult {
    pub dead: u32,
    pub alive: u32,
    /// Crops, logs, weeds or boss drop, before any contract reward.
    pub loot: LootBundle,
    pub harvest_xp: f64,
    /// Health-check XP for the surviving plants.
    pub check_xp: f64,
    /// Raking XP for patches that held no crop.
    pub rake_xp: f64,
    pub woodcutting_xp: f64,
    /// Coins owed for clearing trees the minion could not chop.
    pub clearing_fee: u64,
    /// The harvest was a Hespori kill.
    pub boss_kill: bool,
}

/// Levels and bank contents a harvest depends on.
#[derive(Debug, Clone, Copy)]
pub struct Harvester<'a> {
    pub farming_level: u8,
    /// Decides whether grown trees are chopped or cleared for a fee.
    pub woodcutting_level: u8,
    /// Checked for harvest-boosting tools and the farmer's outfit.
    pub bank: &'a LootBundle,
}

/// Roll the harvest of `plant` from a patch in `patch` state.
///
/// `replant_quantity` is the number of patches planted in the same trip;
/// patches beyond the harvested ones are raked first.
pub fn simulate_harvest(
    plant: &Plant,
    patch: &PatchState,
    replant_quantity: u32,
    harvester: Harvester<'_>,
    content: &dyn ContentTables,
    rng: &mut dyn RandomSource,
) -> HarvestResult {
    let mut result = HarvestResult::default();
    let planted = patch.last_quantity;
    if planted > 0 {
        let reduction = death_reduction(patch.last_upgrade_tier, patch.last_payment);
        result.dead = count_deaths(
            rng,
            planted,
            plant.num_of_stages,
            plant.chance_of_death,
            reduction,
        );
        result.alive = planted - result.dead;
        result.check_xp = f64::from(result.alive) * plant.check_xp;
        harvest_crops(plant, patch, harvester, content, rng, &mut result);
    }

    if replant_quantity > planted {
        let extra = replant_quantity - planted;
        result.loot.add(items::WEEDS, u64::from(extra) * WEEDS_PER_PATCH);
        result.rake_xp = f64::from(extra) * RAKE_XP_PER_PATCH;
    }
    result
}

/// Roll for the Tangleroot pet after a harvest with `alive` surviving plants.
///
/// `farming_level` is the level reached once the harvest XP is added.
pub fn roll_pet(plant: &Plant, farming_level: u8, alive: u32, rng: &mut dyn RandomSource) -> bool {
    pet_one_in(plant.pet_chance, farming_level, alive).is_some_and(|one_in| roll(rng, one_in))
}

fn harvest_crops(
    plant: &Plant,
    patch: &PatchState,
    harvester: Harvester<'_>,
    content: &dyn ContentTables,
    rng: &mut dyn RandomSource,
    result: &mut HarvestResult,
) {
    let alive = result.alive;
    if alive == 0 {
        return;
    }

    let mut crop_yield = 0;
    if let Some(crop) = plant.output_crop {
        crop_yield = match plant.yield_model {
            YieldModel::Fixed(amount) => u64::from(amount),
            YieldModel::Variable => content.variable_yield(
                plant,
                patch.last_upgrade_tier,
                harvester.farming_level,
                rng,
            ),
            YieldModel::Lives => {
                let chance =
                    save_chance(plant, harvester.farming_level, harvest_bonus(harvester.bank));
                lives_yield(rng, alive, starting_lives(plant, patch.last_upgrade_tier), chance)
            }
        };
        result.loot.add(crop, crop_yield);
        result.harvest_xp = if plant.flat_harvest_xp {
            plant.harvest_xp
        } else {
            crop_yield as f64 * plant.harvest_xp
        };
    }

    if plant.needs_chop_for_harvest {
        let required = plant.tree_woodcutting_level.unwrap_or(1);
        let chopped = harvester.woodcutting_level >= required;
        if !chopped {
            result.clearing_fee = TREE_CLEARING_FEE * u64::from(alive);
            result.harvest_xp = 0.0;
        } else if let (Some(logs), Some(xp)) = (plant.output_logs, plant.woodcutting_xp) {
            let per_tree = rng.int_inclusive(5, 10);
            result.loot.add(logs, per_tree * u64::from(alive));
            result.woodcutting_xp = (per_tree * u64::from(alive)) as f64 * xp;
            result.harvest_xp = 0.0;
        } else if let Some(crop) = plant.output_crop {
            let total = crop_yield * u64::from(alive);
            result.loot.set(crop, total);
            result.harvest_xp = total as f64 * plant.harvest_xp;
        }
    }

    if plant.seed_type == SeedType::Hespori {
        result.loot = content.boss_loot(monsters::HESPORI, rng);
        result.boss_kill = true;
    }
}

/// Resolves [`ActivityKind::Farming`] tasks.
#[derive(Debug, Default, Clone, Copy)]
pub struct FarmingHandler;

impl FarmingHandler {
    fn fault(task: &ActivityTask, message: String) -> ActivityError {
        ActivityError::HandlerFault {
            task_id: task.id.clone(),
            message,
        }
    }
}

#[async_trait]
impl ActivityHandler for FarmingHandler {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Farming
    }

    async fn resolve(
        &self,
        task: &ActivityTask,
        ctx: &mut HandlerContext,
    ) -> Result<ActivityOutcome> {
        let ActivityPayload::Farming(payload) = &task.payload else {
            return Err(Self::fault(
                task,
                format!("farming handler received a {} payload", task.kind),
            ));
        };
        let user = &task.user_id;
        let state = ctx.state.clone();
        let content = ctx.content.clone();
        let name = minion_name(state.as_ref(), task).await?;

        let new_plant = match (&payload.plant_name, payload.planting) {
            (Some(plant_name), true) => Some(content.plant(plant_name).ok_or_else(|| {
                Self::fault(task, format!("unknown plant `{plant_name}` in payload"))
            })?),
            _ => None,
        };
        let planting_xp = new_plant.map_or(0.0, |plant| {
            let compost_xp = payload.upgrade_tier.map_or(0.0, CompostTier::planting_xp);
            f64::from(payload.quantity) * (plant.plant_xp + compost_xp)
        });

        let patch = &payload.patch_state;
        if !patch.is_harvestable {
            let Some(plant) = new_plant else {
                return Err(Self::fault(task, "nothing to plant in an empty patch".to_owned()));
            };
            let rake_xp = f64::from(payload.quantity) * RAKE_XP_PER_PATCH;
            let weeds =
                LootBundle::from([(items::WEEDS, u64::from(payload.quantity) * WEEDS_PER_PATCH)]);
            let total_xp = (planting_xp + rake_xp).floor() as u64;

            let gain = state.add_xp(user, Skill::Farming, total_xp).await?;
            state.add_to_bank(user, &weeds).await?;
            write_patch(state.as_ref(), task, payload, ctx.now_ms).await?;

            let mut message = format!(
                "{name} finished raking {qty} patches and planting {qty}x {}.\n\
                 You received {} XP from planting and {} XP from raking for a total of \
                 {total_xp} Farming XP.",
                plant.name,
                planting_xp.floor(),
                rake_xp.floor(),
                qty = payload.quantity,
            );
            if gain.leveled_up() {
                message.push_str(&format!(
                    "\n\n{name}'s Farming level is now {}!",
                    gain.after_level
                ));
            }
            message.push_str(&format!(
                "\n\nYou received: {}.\n\n{name} tells you to come back after your plants \
                 have finished growing!",
                readable_items(content.as_ref(), &weeds)
            ));
            return Ok(ActivityOutcome::message(message));
        }

        let last_planted = patch.last_planted.as_deref().unwrap_or_default();
        let harvested = content.plant(last_planted).ok_or_else(|| {
            Self::fault(task, format!("unknown plant `{last_planted}` in patch state"))
        })?;

        let bank = state.bank(user).await?;
        let farming_level = state.skill_level(user, Skill::Farming).await?;
        let harvester = Harvester {
            farming_level,
            woodcutting_level: state.skill_level(user, Skill::Woodcutting).await?,
            bank: &bank,
        };
        let replant = if payload.planting { payload.quantity } else { 0 };
        let mut result = simulate_harvest(
            harvested,
            patch,
            replant,
            harvester,
            content.as_ref(),
            ctx.rng.as_mut(),
        );
        debug!(
            task_id = %task.id,
            alive = result.alive,
            dead = result.dead,
            "farming harvest rolled"
        );

        // Nothing is committed until the clearing fee is known to be payable.
        if result.clearing_fee > 0 {
            if state.currency(user).await? < result.clearing_fee {
                return Err(ActivityError::InsufficientResources(
                    "You do not have the required woodcutting level or enough GP to clear your \
                     patches in order to be able to plant more."
                        .to_owned(),
                ));
            }
            state.remove_currency(user, result.clearing_fee).await?;
        }

        let contract = FARMING_CONTRACT.load(state.as_ref(), user).await?;
        let contract_done = result.alive > 0
            && contract
                .plant_to_grow
                .as_deref()
                .is_some_and(|target| target.eq_ignore_ascii_case(&harvested.name));
        if contract_done {
            let next = FarmingContract {
                plant_to_grow: None,
                plant_tier: 0,
                difficulty_level: None,
                contracts_completed: contract.contracts_completed + 1,
                seed_pack_tier: contract.plant_tier,
            };
            FARMING_CONTRACT.store(state.as_ref(), user, &next).await?;
            result.loot.add(items::SEED_PACK, 1);
        }

        let farming_xp = planting_xp + result.harvest_xp + result.check_xp + result.rake_xp;
        let bonus_xp = (farming_xp * outfit_multiplier(&bank)).floor() as u64;
        let total_xp = farming_xp.floor() as u64 + bonus_xp;
        let woodcutting_xp = result.woodcutting_xp.floor() as u64;

        let farming_gain = state.add_xp(user, Skill::Farming, total_xp).await?;
        let pet = roll_pet(
            harvested,
            farming_gain.after_level,
            result.alive,
            ctx.rng.as_mut(),
        );
        if pet {
            result.loot.add(items::TANGLEROOT, 1);
        }
        let woodcutting_gain = if woodcutting_xp > 0 {
            Some(state.add_xp(user, Skill::Woodcutting, woodcutting_xp).await?)
        } else {
            None
        };
        if result.boss_kill {
            state
                .increment_kill_count(user, monsters::HESPORI, 1)
                .await?;
        }
        state.add_to_bank(user, &result.loot).await?;
        write_patch(state.as_ref(), task, payload, ctx.now_ms).await?;

        let mut message = if let Some(plant) = new_plant {
            format!(
                "{name} finished planting {}x {} and harvesting {}x {}.",
                payload.quantity, plant.name, patch.last_quantity, harvested.name
            )
        } else {
            format!(
                "{name} finished harvesting {}x {}.",
                patch.last_quantity, harvested.name
            )
        };
        if result.dead > 0 {
            message.push_str(&format!(
                " During your harvest, you found that {}/{} of your plants died.",
                result.dead, patch.last_quantity
            ));
        }
        if result.clearing_fee > 0 {
            message.push_str(&format!(
                " *You did not have the woodcutting level required, so you paid a nearby \
                 farmer {TREE_CLEARING_FEE} GP per patch to remove the previous tree.*"
            ));
        }
        message.push_str(&format!(
            "\n\nYou received {} XP for planting, {} XP for raking, {} XP for harvesting, and \
             {} XP for checking health for a total of {} Farming XP.",
            planting_xp.floor(),
            result.rake_xp.floor(),
            result.harvest_xp.floor(),
            result.check_xp.floor(),
            farming_xp.floor()
        ));
        if woodcutting_xp > 0 {
            message.push_str(&format!(
                " You also received {woodcutting_xp} Woodcutting XP."
            ));
        }
        if bonus_xp > 0 {
            message.push_str(&format!(
                " You received an additional {bonus_xp} bonus XP from your farmer's outfit."
            ));
        }
        if farming_gain.leveled_up() {
            message.push_str(&format!(
                "\n\n{name}'s Farming level is now {}!",
                farming_gain.after_level
            ));
        }
        if let Some(gain) = woodcutting_gain.filter(|g| g.leveled_up()) {
            message.push_str(&format!(
                "\n\n{name}'s Woodcutting level is now {}!",
                gain.after_level
            ));
        }
        if pet {
            message.push_str("\n\nYou have a funny feeling you're being followed...");
        }
        if !result.loot.is_empty() {
            message.push_str(&format!(
                "\nYou received: {}.",
                readable_items(content.as_ref(), &result.loot)
            ));
        }
        if contract_done {
            message.push_str(&format!(
                "\n\nYou've completed your contract and have been rewarded with 1 Seed pack. \
                 You have completed {} farming contracts.",
                contract.contracts_completed + 1
            ));
        }
        if new_plant.is_some() {
            message.push_str(&format!(
                "\n\n{name} tells you to come back after your plants have finished growing!"
            ));
        }
        Ok(ActivityOutcome::message(message))
    }
}

/// Persist the patch state left behind by a resolved cycle.
async fn write_patch(
    state: &dyn UserStateStore,
    task: &ActivityTask,
    payload: &FarmingPayload,
    now_ms: u64,
) -> Result<()> {
    let next = if payload.planting {
        PatchState {
            last_planted: payload.plant_name.clone(),
            last_quantity: payload.quantity,
            last_upgrade_tier: payload.upgrade_tier,
            last_payment: payload.pay,
            is_harvestable: true,
            planted_at_ms: now_ms,
        }
    } else {
        PatchState::default()
    };
    farming_patch(payload.patch)
        .store(state, &task.user_id, &next)
        .await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::content::StandardContent;
    use crate::notifier::LoggingNotifier;
    use crate::rng::ScriptedRandom;
    use crate::scheduler::{Dispatcher, InMemoryTaskStore, ManualClock, Scheduler, TaskStore};
    use crate::state::memory::EconomyOffline;
    use crate::state::{InMemoryUserStore, xp_for_level};
    use std::sync::Arc;

    fn harvester(bank: &LootBundle) -> Harvester<'_> {
        Harvester {
            farming_level: 99,
            woodcutting_level: 99,
            bank,
        }
    }

    fn grown(plant: &str, quantity: u32) -> PatchState {
        PatchState {
            last_planted: Some(plant.to_owned()),
            last_quantity: quantity,
            is_harvestable: true,
            ..PatchState::default()
        }
    }

    #[test]
    fn cycle_durations() {
        assert_eq!(cycle_duration(4, false, false), 80_000);
        assert_eq!(cycle_duration(4, true, true), 140_000);
        assert_eq!(cycle_duration(0, true, false), 30_000);
    }

    #[test]
    fn empty_harvest_gives_nothing() {
        let content = StandardContent::new();
        let plant = content.plant("Guam").unwrap();
        let bank = LootBundle::new();
        let mut rng = ScriptedRandom::new([0.0]);
        let result = simulate_harvest(
            plant,
            &grown("Guam", 0),
            0,
            harvester(&bank),
            &content,
            &mut rng,
        );
        assert_eq!(result, HarvestResult::default());
    }

    #[test]
    fn all_dead_yields_nothing_and_no_pet() {
        let content = StandardContent::new();
        let plant = content.plant("Guam").unwrap();
        let bank = LootBundle::new();
        // 0.0 is below any positive death threshold.
        let mut rng = ScriptedRandom::new([0.0]);
        let result = simulate_harvest(
            plant,
            &grown("Guam", 3),
            0,
            harvester(&bank),
            &content,
            &mut rng,
        );
        assert_eq!((result.dead, result.alive), (3, 0));
        assert!(result.loot.is_empty());
        assert_eq!(result.harvest_xp, 0.0);
        assert!(!roll_pet(plant, 99, result.alive, &mut rng));
    }

    #[test]
    fn limpwurt_gets_flat_harvest_xp() {
        let content = StandardContent::new();
        let plant = content.plant("Limpwurt").unwrap();
        let bank = LootBundle::new();
        // Survive every stage.
        let mut rng = ScriptedRandom::new([0.99]);
        let result = simulate_harvest(
            plant,
            &grown("Limpwurt", 2),
            0,
            harvester(&bank),
            &content,
            &mut rng,
        );
        assert_eq!(result.alive, 2);
        assert_eq!(result.loot.amount(items::LIMPWURT_ROOT), 3);
        assert_eq!(result.harvest_xp, plant.harvest_xp);
    }

    #[test]
    fn unchoppable_trees_cost_coins_and_harvest_xp() {
        let content = StandardContent::new();
        let plant = content.plant("Oak tree").unwrap();
        let bank = LootBundle::new();
        let mut rng = ScriptedRandom::new([0.99]);
        let lumberjack = Harvester {
            farming_level: 50,
            woodcutting_level: 1,
            bank: &bank,
        };
        let result = simulate_harvest(
            plant,
            &grown("Oak tree", 2),
            0,
            lumberjack,
            &content,
            &mut rng,
        );
        assert_eq!(result.clearing_fee, 400);
        assert_eq!(result.harvest_xp, 0.0);
        assert_eq!(result.woodcutting_xp, 0.0);
        assert_eq!(result.loot.amount(items::OAK_LOGS), 0);
    }

    #[test]
    fn chopped_trees_give_logs_per_alive_tree() {
        let content = StandardContent::new();
        let plant = content.plant("Oak tree").unwrap();
        let bank = LootBundle::new();
        // 0.99 survives, then maps to 10 logs per tree.
        let mut rng = ScriptedRandom::new([0.99]);
        let result = simulate_harvest(
            plant,
            &grown("Oak tree", 2),
            0,
            harvester(&bank),
            &content,
            &mut rng,
        );
        assert_eq!(result.loot.amount(items::OAK_LOGS), 20);
        assert_eq!(result.woodcutting_xp, 20.0 * 37.5);
        assert_eq!(result.clearing_fee, 0);
    }

    #[test]
    fn chopped_crop_trees_multiply_yield() {
        let content = StandardContent::new();
        let plant = content.plant("Celastrus tree").unwrap();
        let bank = LootBundle::new();
        let mut rng = ScriptedRandom::new([0.99]);
        let result = simulate_harvest(
            plant,
            &grown("Celastrus tree", 3),
            0,
            harvester(&bank),
            &content,
            &mut rng,
        );
        assert_eq!(result.loot.amount(items::BATTLESTAFF), 6);
        assert_eq!(result.harvest_xp, 6.0 * plant.harvest_xp);
    }

    #[test]
    fn hespori_replaces_loot_with_boss_drop() {
        let content = StandardContent::new();
        let plant = content.plant("Hespori").unwrap();
        let bank = LootBundle::new();
        let mut rng = ScriptedRandom::new([0.99]);
        let result = simulate_harvest(
            plant,
            &grown("Hespori", 1),
            0,
            harvester(&bank),
            &content,
            &mut rng,
        );
        assert!(result.boss_kill);
        let seeds = result.loot.amount(items::ATTAS_SEED)
            + result.loot.amount(items::IASOR_SEED)
            + result.loot.amount(items::KRONOS_SEED);
        assert_eq!(seeds, 1);
    }

    #[test]
    fn replanting_more_patches_rakes_the_extra() {
        let content = StandardContent::new();
        let plant = content.plant("Guam").unwrap();
        let bank = LootBundle::new();
        let mut rng = ScriptedRandom::new([0.99]);
        let result = simulate_harvest(
            plant,
            &grown("Guam", 2),
            5,
            harvester(&bank),
            &content,
            &mut rng,
        );
        assert_eq!(result.loot.amount(items::WEEDS), 9);
        assert_eq!(result.rake_xp, 36.0);
    }

    #[tokio::test]
    async fn cycle_starts_when_economy_stats_are_unreachable() {
        let state = Arc::new(EconomyOffline::default());
        let user = UserId::new("u1");
        state
            .add_xp(&user, Skill::Farming, xp_for_level(30))
            .await
            .unwrap();
        state
            .add_to_bank(&user, &LootBundle::from([(items::GUAM_SEED, 2)]))
            .await
            .unwrap();
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let dispatcher = Dispatcher::new(
            store.clone(),
            state.clone(),
            Arc::new(LoggingNotifier),
            clock.clone(),
        );
        let scheduler = Scheduler::new(store, clock, dispatcher);
        let content = StandardContent::new();
        let planning = PlanningContext {
            scheduler: &scheduler,
            state: state.as_ref(),
            content: &content,
        };

        let request = CycleRequest::Plant {
            plant_name: "Guam".to_owned(),
            quantity: 2,
            compost: None,
            pay: false,
        };
        let cycle = plan_cycle(&planning, &user, &ChannelId::new("c1"), request)
            .await
            .unwrap();
        assert_eq!(cycle.removed.amount(items::GUAM_SEED), 2);
        assert!(state.bank(&user).await.unwrap().is_empty());
        assert!(scheduler.is_busy(&user).unwrap());
    }

    fn ctx(state: Arc<InMemoryUserStore>, rolls: Vec<f64>) -> HandlerContext {
        HandlerContext {
            state,
            rng: Box::new(ScriptedRandom::new(rolls)),
            content: Arc::new(StandardContent::new()),
            now_ms: 42,
        }
    }

    fn farming_task(payload: FarmingPayload) -> ActivityTask {
        ActivityTask::new(
            UserId::new("u1"),
            ChannelId::new("c1"),
            ActivityPayload::Farming(payload),
            0,
            60_000,
            1,
        )
    }

    #[tokio::test]
    async fn planting_grants_rake_and_plant_xp() {
        let state = Arc::new(InMemoryUserStore::new());
        let mut ctx = ctx(state.clone(), vec![0.99]);
        let task = farming_task(FarmingPayload {
            plant_name: Some("Guam".to_owned()),
            patch: PatchKind::Herb,
            patch_state: PatchState::default(),
            quantity: 4,
            upgrade_tier: Some(CompostTier::Supercompost),
            pay: false,
            planting: true,
        });

        FarmingHandler.resolve(&task, &mut ctx).await.unwrap();

        // 4 * 12 raking + 4 * (11 + 26) planting
        assert_eq!(
            state.skill_xp(&task.user_id, Skill::Farming).await.unwrap(),
            48 + 148
        );
        assert_eq!(
            state.bank(&task.user_id).await.unwrap().amount(items::WEEDS),
            12
        );
        let patch = farming_patch(PatchKind::Herb)
            .load(state.as_ref(), &task.user_id)
            .await
            .unwrap();
        assert!(patch.is_harvestable);
        assert_eq!(patch.last_quantity, 4);
        assert_eq!(patch.last_upgrade_tier, Some(CompostTier::Supercompost));
        assert_eq!(patch.planted_at_ms, 42);
    }

    /// Standard tables with a Guam whose pet odds are easy to reason about.
    struct FriendlyGuam {
        guam: Plant,
        standard: StandardContent,
    }

    impl ContentTables for FriendlyGuam {
        fn plant(&self, name: &str) -> Option<&Plant> {
            if name.eq_ignore_ascii_case(&self.guam.name) {
                Some(&self.guam)
            } else {
                self.standard.plant(name)
            }
        }

        fn variable_yield(
            &self,
            plant: &Plant,
            tier: Option<CompostTier>,
            farming_level: u8,
            rng: &mut dyn RandomSource,
        ) -> u64 {
            self.standard.variable_yield(plant, tier, farming_level, rng)
        }

        fn boss_loot(&self, monster_id: u32, rng: &mut dyn RandomSource) -> LootBundle {
            self.standard.boss_loot(monster_id, rng)
        }
    }

    #[tokio::test]
    async fn pet_odds_use_the_level_reached_by_the_harvest() {
        let standard = StandardContent::new();
        let mut guam = standard.plant("Guam").unwrap().clone();
        // 1 in 2 at level 9, certain from level 10.
        guam.pet_chance = Some(2 + 25 * 9);
        assert_eq!(pet_one_in(guam.pet_chance, 9, 1), Some(2));
        assert_eq!(pet_one_in(guam.pet_chance, 10, 1), Some(1));

        let state = Arc::new(InMemoryUserStore::new());
        let user = UserId::new("u1");
        state
            .add_xp(&user, Skill::Farming, xp_for_level(10) - 1)
            .await
            .unwrap();
        let mut ctx = HandlerContext {
            state: state.clone(),
            // Survives, and misses a 1 in 2 roll.
            rng: Box::new(ScriptedRandom::new([0.99])),
            content: Arc::new(FriendlyGuam { guam, standard }),
            now_ms: 0,
        };
        let task = farming_task(FarmingPayload {
            plant_name: None,
            patch: PatchKind::Herb,
            patch_state: grown("Guam", 1),
            quantity: 0,
            upgrade_tier: None,
            pay: false,
            planting: false,
        });

        let outcome = FarmingHandler.resolve(&task, &mut ctx).await.unwrap();
        assert!(state.skill_level(&user, Skill::Farming).await.unwrap() >= 10);
        assert_eq!(state.bank(&user).await.unwrap().amount(items::TANGLEROOT), 1);
        assert!(outcome.message.contains("being followed"));
    }

    #[tokio::test]
    async fn unpaid_clearing_fee_commits_nothing() {
        let state = Arc::new(InMemoryUserStore::new());
        let mut ctx = ctx(state.clone(), vec![0.99]);
        let task = farming_task(FarmingPayload {
            plant_name: None,
            patch: PatchKind::Tree,
            patch_state: grown("Oak tree", 2),
            quantity: 0,
            upgrade_tier: None,
            pay: false,
            planting: false,
        });

        let err = FarmingHandler.resolve(&task, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActivityError::InsufficientResources(_)));
        assert_eq!(state.skill_xp(&task.user_id, Skill::Farming).await.unwrap(), 0);
        assert!(state.bank(&task.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn contract_completion_rewards_seed_pack() {
        let state = Arc::new(InMemoryUserStore::new());
        let user = UserId::new("u1");
        FARMING_CONTRACT
            .store(
                state.as_ref(),
                &user,
                &FarmingContract {
                    plant_to_grow: Some("Potato".to_owned()),
                    plant_tier: 2,
                    contracts_completed: 4,
                    ..FarmingContract::default()
                },
            )
            .await
            .unwrap();
        let mut ctx = ctx(state.clone(), vec![0.99]);
        let task = farming_task(FarmingPayload {
            plant_name: None,
            patch: PatchKind::Allotment,
            patch_state: grown("Potato", 3),
            quantity: 0,
            upgrade_tier: None,
            pay: false,
            planting: false,
        });

        let outcome = FarmingHandler.resolve(&task, &mut ctx).await.unwrap();
        let bank = state.bank(&user).await.unwrap();
        assert_eq!(bank.amount(items::SEED_PACK), 1);
        assert!(bank.amount(items::POTATO) > 0);
        let contract = FARMING_CONTRACT.load(state.as_ref(), &user).await.unwrap();
        assert_eq!(contract.contracts_completed, 5);
        assert_eq!(contract.seed_pack_tier, 2);
        assert_eq!(contract.plant_to_grow, None);
        assert!(outcome.message.contains("completed 5 farming contracts"));

        let patch = farming_patch(PatchKind::Allotment)
            .load(state.as_ref(), &user)
            .await
            .unwrap();
        assert_eq!(patch, PatchState::default());
    }
}
