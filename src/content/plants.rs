//! Plant metadata consumed by the farming handler.

use crate::activity::PatchKind;
use crate::content::ItemId;
use crate::content::items;

/// Growth family of a plant; some families change harvest rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedType {
    Herb,
    Allotment,
    Flower,
    /// Bushes always start the lives loop with four lives.
    Bush,
    Tree,
    FruitTree,
    Hardwood,
    Crystal,
    Celastrus,
    /// Resolves through a boss-loot roll instead of a crop yield.
    Hespori,
}

/// How the crop amount of a harvested patch is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YieldModel {
    /// Same amount every harvest.
    Fixed(u32),
    /// Delegated to [`ContentTables::variable_yield`](super::ContentTables::variable_yield).
    Variable,
    /// Per-plant lives loop driven by the `chance1`/`chance99` curve.
    Lives,
}

/// Static description of one farmable species.
#[derive(Debug, Clone, PartialEq)]
pub struct Plant {
    pub name: String,
    pub seed: ItemId,
    pub patch: PatchKind,
    pub seed_type: SeedType,
    pub level: u8,
    pub plant_xp: f64,
    pub check_xp: f64,
    pub harvest_xp: f64,
    /// Harvest XP is granted once per patch instead of per crop.
    pub flat_harvest_xp: bool,
    pub num_of_stages: u32,
    /// Death chance per growth stage, out of 128.
    pub chance_of_death: u32,
    /// Save-a-life chance at level 1 and 99, out of 256.
    pub chance1: f64,
    pub chance99: f64,
    pub output_crop: Option<ItemId>,
    pub yield_model: YieldModel,
    pub needs_chop_for_harvest: bool,
    pub tree_woodcutting_level: Option<u8>,
    pub output_logs: Option<ItemId>,
    pub woodcutting_xp: Option<f64>,
    pub pet_chance: Option<u32>,
    pub growth_time_ms: u64,
    /// Items a gardener takes per patch to guarantee the crop survives.
    pub protection_payment: Option<(ItemId, u64)>,
}

impl Plant {
    /// A plant with no XP, no output and no death chance.
    pub fn base(name: &str, seed: ItemId, patch: PatchKind, seed_type: SeedType, level: u8) -> Self {
        Self {
            name: name.to_owned(),
            seed,
            patch,
            seed_type,
            level,
            plant_xp: 0.0,
            check_xp: 0.0,
            harvest_xp: 0.0,
            flat_harvest_xp: false,
            num_of_stages: 1,
            chance_of_death: 0,
            chance1: 0.0,
            chance99: 0.0,
            output_crop: None,
            yield_model: YieldModel::Lives,
            needs_chop_for_harvest: false,
            tree_woodcutting_level: None,
            output_logs: None,
            woodcutting_xp: None,
            pet_chance: None,
            growth_time_ms: 0,
            protection_payment: None,
        }
    }

    /// Returns `true` when the harvest produces a crop item.
    pub fn gives_crops(&self) -> bool {
        self.output_crop.is_some()
    }

    /// Returns `true` when chopping the plant produces logs.
    pub fn gives_logs(&self) -> bool {
        self.output_logs.is_some()
    }
}

const MINUTE_MS: u64 = 60 * 1000;

/// The small species table shipped with the crate.
pub(crate) fn standard_plants() -> Vec<Plant> {
    vec![
        Plant {
            plant_xp: 11.0,
            harvest_xp: 12.5,
            num_of_stages: 4,
            chance_of_death: 28,
            chance1: 25.0,
            chance99: 80.0,
            output_crop: Some(items::GRIMY_GUAM_LEAF),
            pet_chance: Some(98_364),
            growth_time_ms: 80 * MINUTE_MS,
            ..Plant::base("Guam", items::GUAM_SEED, PatchKind::Herb, SeedType::Herb, 9)
        },
        Plant {
            plant_xp: 8.0,
            harvest_xp: 9.0,
            num_of_stages: 4,
            chance_of_death: 28,
            chance1: 101.0,
            chance99: 180.0,
            output_crop: Some(items::POTATO),
            pet_chance: Some(281_040),
            growth_time_ms: 40 * MINUTE_MS,
            protection_payment: Some((items::COMPOST, 2)),
            ..Plant::base("Potato", items::POTATO_SEED, PatchKind::Allotment, SeedType::Allotment, 1)
        },
        Plant {
            plant_xp: 11.5,
            check_xp: 64.0,
            harvest_xp: 4.5,
            num_of_stages: 5,
            chance_of_death: 17,
            chance1: 120.0,
            chance99: 190.0,
            output_crop: Some(items::REDBERRIES),
            pet_chance: Some(349_194),
            growth_time_ms: 100 * MINUTE_MS,
            protection_payment: Some((items::CABBAGES_10, 4)),
            ..Plant::base("Redberry", items::REDBERRY_SEED, PatchKind::Bush, SeedType::Bush, 10)
        },
        Plant {
            plant_xp: 21.5,
            harvest_xp: 120.0,
            flat_harvest_xp: true,
            num_of_stages: 4,
            chance_of_death: 20,
            output_crop: Some(items::LIMPWURT_ROOT),
            yield_model: YieldModel::Fixed(3),
            pet_chance: Some(281_040),
            growth_time_ms: 20 * MINUTE_MS,
            ..Plant::base(
                "Limpwurt",
                items::LIMPWURT_SEED,
                PatchKind::Flower,
                SeedType::Flower,
                26,
            )
        },
        Plant {
            plant_xp: 14.0,
            check_xp: 467.3,
            num_of_stages: 5,
            chance_of_death: 20,
            needs_chop_for_harvest: true,
            tree_woodcutting_level: Some(15),
            output_logs: Some(items::OAK_LOGS),
            woodcutting_xp: Some(37.5),
            pet_chance: Some(22_483),
            growth_time_ms: 200 * MINUTE_MS,
            protection_payment: Some((items::TOMATOES_5, 1)),
            ..Plant::base("Oak tree", items::ACORN, PatchKind::Tree, SeedType::Tree, 15)
        },
        Plant {
            plant_xp: 126.0,
            check_xp: 2_080.0,
            harvest_xp: 0.0,
            num_of_stages: 6,
            output_crop: Some(items::CRYSTAL_SHARD),
            yield_model: YieldModel::Variable,
            pet_chance: Some(9_000),
            growth_time_ms: 480 * MINUTE_MS,
            ..Plant::base(
                "Crystal tree",
                items::CRYSTAL_ACORN,
                PatchKind::Crystal,
                SeedType::Crystal,
                74,
            )
        },
        Plant {
            plant_xp: 204.0,
            check_xp: 14_130.0,
            harvest_xp: 23.5,
            num_of_stages: 5,
            chance_of_death: 15,
            output_crop: Some(items::BATTLESTAFF),
            yield_model: YieldModel::Fixed(2),
            needs_chop_for_harvest: true,
            tree_woodcutting_level: Some(45),
            pet_chance: Some(9_000),
            growth_time_ms: 800 * MINUTE_MS,
            protection_payment: Some((items::POTATO_CACTUS, 8)),
            ..Plant::base(
                "Celastrus tree",
                items::CELASTRUS_SEED,
                PatchKind::Celastrus,
                SeedType::Celastrus,
                85,
            )
        },
        Plant {
            plant_xp: 62.0,
            check_xp: 12_600.0,
            num_of_stages: 4,
            pet_chance: Some(7_000),
            growth_time_ms: 1_920 * MINUTE_MS,
            ..Plant::base(
                "Hespori",
                items::HESPORI_SEED,
                PatchKind::Hespori,
                SeedType::Hespori,
                65,
            )
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_has_every_yield_model() {
        let plants = standard_plants();
        assert!(plants.iter().any(|p| p.yield_model == YieldModel::Lives && p.gives_crops()));
        assert!(plants.iter().any(|p| matches!(p.yield_model, YieldModel::Fixed(_))));
        assert!(plants.iter().any(|p| p.yield_model == YieldModel::Variable));
        assert!(plants.iter().any(|p| p.seed_type == SeedType::Hespori));
        assert!(plants.iter().any(|p| p.needs_chop_for_harvest && p.gives_logs()));
        assert!(plants.iter().any(|p| p.needs_chop_for_harvest && p.gives_crops()));
    }

    #[test]
    fn chop_plants_declare_woodcutting_level() {
        for plant in standard_plants().iter().filter(|p| p.needs_chop_for_harvest) {
            assert!(plant.tree_woodcutting_level.is_some(), "{}", plant.name);
        }
    }
}
