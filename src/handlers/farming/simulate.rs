//! Growth and harvest rolls.
//!
//! Pure functions over a [`RandomSource`]; every loop is bounded by the
//! number of plants in the patch.

use crate::activity::CompostTier;
use crate::content::{Plant, SeedType, items};
use crate::rng::RandomSource;
use crate::state::LootBundle;

/// Lives every plant starts the harvest loop with before compost.
pub const BASE_LIVES: u32 = 3;
/// Bushes ignore compost and always start with this many lives.
pub const BUSH_LIVES: u32 = 4;
/// Upper bound on harvest rolls for a single plant.
pub const MAX_ROLLS_PER_PLANT: u32 = 1_000;
/// Save chances are clamped just below certainty so every loop ends.
pub const MAX_SAVE_CHANCE: f64 = 0.99;

/// Multiplier on a plant's chance of death for the compost used and
/// whether a gardener was paid.
pub fn death_reduction(tier: Option<CompostTier>, paid: bool) -> f64 {
    if paid {
        return 0.0;
    }
    tier.map_or(1.0, CompostTier::death_reduction)
}

/// Per-stage probability that a plant dies.
pub fn death_threshold(chance_of_death: u32, reduction: f64) -> f64 {
    (f64::from(chance_of_death) * reduction).floor() / 128.0
}

/// Count dead plants among `plants`, rolling once per growth stage except
/// the last. The first failed roll kills a plant; deaths never compound.
pub fn count_deaths(
    rng: &mut dyn RandomSource,
    plants: u32,
    stages: u32,
    chance_of_death: u32,
    reduction: f64,
) -> u32 {
    let threshold = death_threshold(chance_of_death, reduction);
    if threshold <= 0.0 {
        return 0;
    }
    let mut dead = 0;
    for _ in 0..plants {
        for _ in 0..stages.saturating_sub(1) {
            if rng.next_f64() < threshold {
                dead += 1;
                break;
            }
        }
    }
    dead
}

/// Multiplier on the save-a-life curve from harvesting equipment in the bank.
pub fn harvest_bonus(bank: &LootBundle) -> f64 {
    let mut bonus = 1.0;
    if bank.has(items::MAGIC_SECATEURS, 1) {
        bonus += 0.1;
    }
    if bank.has(items::FARMING_CAPE, 1) || bank.has(items::FARMING_CAPE_T, 1) {
        bonus += 0.05;
    }
    bonus
}

/// Chance that a harvest roll keeps its life, interpolated between the
/// plant's level 1 and level 99 values.
pub fn save_chance(plant: &Plant, farming_level: u8, bonus: f64) -> f64 {
    let level = f64::from(farming_level.clamp(1, 99));
    let curve = (plant.chance1 + (plant.chance99 - plant.chance1) * ((level - 1.0) / 98.0)).floor();
    let factor = (curve * bonus).floor() + 1.0;
    ((factor + 1.0) / 256.0).min(MAX_SAVE_CHANCE)
}

/// Harvest lives of one plant: bushes have a fixed count, other crops
/// gain lives from compost.
pub fn starting_lives(plant: &Plant, tier: Option<CompostTier>) -> u32 {
    if plant.seed_type == SeedType::Bush {
        return BUSH_LIVES;
    }
    BASE_LIVES + tier.map_or(0, CompostTier::extra_lives)
}

/// Crops from the lives loop: every roll yields one crop, and a failed save
/// costs a life, until each plant runs out of lives.
pub fn lives_yield(rng: &mut dyn RandomSource, alive: u32, lives: u32, chance: f64) -> u64 {
    let mut crops = 0;
    for _ in 0..alive {
        let mut remaining = lives;
        let mut rolls = 0;
        while remaining > 0 && rolls < MAX_ROLLS_PER_PLANT {
            if rng.next_f64() > chance {
                remaining -= 1;
            }
            crops += 1;
            rolls += 1;
        }
    }
    crops
}

/// Bonus XP fraction from farmer's outfit pieces in the bank.
pub fn outfit_multiplier(bank: &LootBundle) -> f64 {
    let pieces = [
        (bank.has(items::FARMERS_STRAWHAT, 1), 0.004),
        (
            bank.has(items::FARMERS_JACKET, 1) || bank.has(items::FARMERS_SHIRT, 1),
            0.008,
        ),
        (bank.has(items::FARMERS_BORO_TROUSERS, 1), 0.006),
        (bank.has(items::FARMERS_BOOTS, 1), 0.002),
    ];
    let mut multiplier: f64 = pieces.iter().filter(|(worn, _)| *worn).map(|(_, b)| b).sum();
    if pieces.iter().all(|(worn, _)| *worn) {
        multiplier += 0.005;
    }
    multiplier
}

/// One-in-N odds of the pet for this harvest, or `None` without a roll.
pub fn pet_one_in(pet_chance: Option<u32>, farming_level: u8, alive: u32) -> Option<u64> {
    let chance = pet_chance?;
    if alive == 0 {
        return None;
    }
    let adjusted = f64::from(chance) - f64::from(farming_level) * 25.0;
    Some((adjusted / f64::from(alive)).floor().max(1.0) as u64)
}
