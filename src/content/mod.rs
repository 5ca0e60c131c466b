//! Game content tables.
//!
//! The real item, species and monster catalogues live outside this crate.
//! Handlers reach them through [`ContentTables`]; [`StandardContent`] is a
//! minimal built-in table covering every rule the handlers implement.

pub mod items;
pub mod plants;

pub use items::{ItemId, monsters};
pub use plants::{Plant, SeedType, YieldModel};

use crate::activity::CompostTier;
use crate::rng::RandomSource;
use crate::state::LootBundle;

/// Lookups and rolls owned by the game-content catalogues.
pub trait ContentTables: Send + Sync {
    /// Species metadata by display name.
    fn plant(&self, name: &str) -> Option<&Plant>;

    /// Crop amount for species using [`YieldModel::Variable`].
    fn variable_yield(
        &self,
        plant: &Plant,
        tier: Option<CompostTier>,
        farming_level: u8,
        rng: &mut dyn RandomSource,
    ) -> u64;

    /// One kill's worth of loot from a boss.
    fn boss_loot(&self, monster_id: u32, rng: &mut dyn RandomSource) -> LootBundle;

    /// Display name used in narrative text.
    fn item_name(&self, id: ItemId) -> String {
        items::name(id)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("item #{id}"))
    }
}

/// Built-in content table.
#[derive(Debug, Clone)]
pub struct StandardContent {
    plants: Vec<Plant>,
}

impl StandardContent {
    /// Load the built-in species table.
    pub fn new() -> Self {
        Self {
            plants: plants::standard_plants(),
        }
    }

    /// All known species.
    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }
}

impl Default for StandardContent {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentTables for StandardContent {
    fn plant(&self, name: &str) -> Option<&Plant> {
        self.plants
            .iter()
            .find(|plant| plant.name.eq_ignore_ascii_case(name))
    }

    fn variable_yield(
        &self,
        plant: &Plant,
        tier: Option<CompostTier>,
        farming_level: u8,
        rng: &mut dyn RandomSource,
    ) -> u64 {
        let compost_bonus = tier.map_or(0, |t| u64::from(t.extra_lives()));
        let level_bonus = u64::from(farming_level.saturating_sub(plant.level) / 5);
        8 + compost_bonus + level_bonus + rng.int_inclusive(0, 2)
    }

    fn boss_loot(&self, monster_id: u32, rng: &mut dyn RandomSource) -> LootBundle {
        let mut loot = LootBundle::new();
        if monster_id != monsters::HESPORI {
            return loot;
        }
        let seeds = [items::ATTAS_SEED, items::IASOR_SEED, items::KRONOS_SEED];
        let pick = rng.int_inclusive(0, seeds.len() as u64 - 1);
        loot.add(seeds[pick as usize], 1);
        if crate::rng::roll(rng, 35) {
            loot.add(items::BOTTOMLESS_COMPOST_BUCKET, 1);
        }
        loot
    }
}
