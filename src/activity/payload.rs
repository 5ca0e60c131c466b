//! Activity kinds and their typed payloads.

use crate::activity::UserId;
use crate::content::ItemId;
use serde::{Deserialize, Serialize};

/// Discriminant of an [`ActivityPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    GloryCharging,
    Agility,
    Cooking,
    Construction,
    MonsterKilling,
    ClueCompletion,
    Fishing,
    Mining,
    Smelting,
    Smithing,
    Firemaking,
    Woodcutting,
    Crafting,
    Fletching,
    Enchanting,
    Casting,
    Pickpocket,
    Burying,
    Offering,
    Cyclops,
    AnimatedArmour,
    Herblore,
    Hunter,
    Alching,
    FightCaves,
    Questing,
    Farming,
    Birdhouse,
    AerialFishing,
    MahoganyHomes,
    FishingTrawler,
    Nightmare,
    Wintertodt,
    TitheFarm,
    Sepulchre,
    Plunder,
    Zalcano,
    BarbarianAssault,
    AgilityArena,
    Sawmill,
    GnomeRestaurant,
}

impl ActivityKind {
    /// Every kind, in declaration order.
    pub const ALL: [ActivityKind; 41] = [
        Self::GloryCharging,
        Self::Agility,
        Self::Cooking,
        Self::Construction,
        Self::MonsterKilling,
        Self::ClueCompletion,
        Self::Fishing,
        Self::Mining,
        Self::Smelting,
        Self::Smithing,
        Self::Firemaking,
        Self::Woodcutting,
        Self::Crafting,
        Self::Fletching,
        Self::Enchanting,
        Self::Casting,
        Self::Pickpocket,
        Self::Burying,
        Self::Offering,
        Self::Cyclops,
        Self::AnimatedArmour,
        Self::Herblore,
        Self::Hunter,
        Self::Alching,
        Self::FightCaves,
        Self::Questing,
        Self::Farming,
        Self::Birdhouse,
        Self::AerialFishing,
        Self::MahoganyHomes,
        Self::FishingTrawler,
        Self::Nightmare,
        Self::Wintertodt,
        Self::TitheFarm,
        Self::Sepulchre,
        Self::Plunder,
        Self::Zalcano,
        Self::BarbarianAssault,
        Self::AgilityArena,
        Self::Sawmill,
        Self::GnomeRestaurant,
    ];

    /// Stable snake_case name, used as the persisted discriminant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GloryCharging => "glory_charging",
            Self::Agility => "agility",
            Self::Cooking => "cooking",
            Self::Construction => "construction",
            Self::MonsterKilling => "monster_killing",
            Self::ClueCompletion => "clue_completion",
            Self::Fishing => "fishing",
            Self::Mining => "mining",
            Self::Smelting => "smelting",
            Self::Smithing => "smithing",
            Self::Firemaking => "firemaking",
            Self::Woodcutting => "woodcutting",
            Self::Crafting => "crafting",
            Self::Fletching => "fletching",
            Self::Enchanting => "enchanting",
            Self::Casting => "casting",
            Self::Pickpocket => "pickpocket",
            Self::Burying => "burying",
            Self::Offering => "offering",
            Self::Cyclops => "cyclops",
            Self::AnimatedArmour => "animated_armour",
            Self::Herblore => "herblore",
            Self::Hunter => "hunter",
            Self::Alching => "alching",
            Self::FightCaves => "fight_caves",
            Self::Questing => "questing",
            Self::Farming => "farming",
            Self::Birdhouse => "birdhouse",
            Self::AerialFishing => "aerial_fishing",
            Self::MahoganyHomes => "mahogany_homes",
            Self::FishingTrawler => "fishing_trawler",
            Self::Nightmare => "nightmare",
            Self::Wintertodt => "wintertodt",
            Self::TitheFarm => "tithe_farm",
            Self::Sepulchre => "sepulchre",
            Self::Plunder => "plunder",
            Self::Zalcano => "zalcano",
            Self::BarbarianAssault => "barbarian_assault",
            Self::AgilityArena => "agility_arena",
            Self::Sawmill => "sawmill",
            Self::GnomeRestaurant => "gnome_restaurant",
        }
    }

    /// Parse a persisted discriminant.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific data captured when the activity was started.
///
/// Serialized internally tagged, so the persisted JSON carries the same
/// discriminant as [`ActivityKind::as_str`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityPayload {
    GloryCharging,
    Agility {
        course_id: String,
    },
    Cooking {
        cookable_id: ItemId,
    },
    Construction {
        object_id: u32,
    },
    MonsterKilling {
        monster_id: u32,
    },
    ClueCompletion {
        clue_id: u32,
    },
    Fishing {
        fish_id: ItemId,
    },
    Mining {
        ore_id: ItemId,
    },
    Smelting {
        bar_id: ItemId,
    },
    Smithing {
        smithed_bar_id: ItemId,
    },
    Firemaking {
        burnable_id: ItemId,
    },
    Woodcutting {
        log_id: ItemId,
    },
    Crafting {
        craftable_id: ItemId,
    },
    Fletching {
        fletchable_name: String,
    },
    Enchanting {
        item_id: ItemId,
    },
    Casting {
        spell_id: u32,
    },
    Pickpocket {
        monster_id: u32,
        xp_received: u64,
        successful_quantity: u32,
        damage_taken: u32,
    },
    Burying {
        bone_id: ItemId,
    },
    Offering {
        bone_id: ItemId,
    },
    Cyclops,
    AnimatedArmour {
        armour_id: String,
    },
    Herblore {
        mixable_id: ItemId,
        zahur: bool,
    },
    Hunter {
        creature_name: String,
        using_hunt_potion: bool,
    },
    Alching {
        item_id: ItemId,
        alch_value: u64,
    },
    FightCaves(FightCavesPayload),
    Questing,
    Farming(FarmingPayload),
    Birdhouse {
        birdhouse_name: Option<String>,
        placing: bool,
        got_craft: bool,
    },
    AerialFishing,
    MahoganyHomes {
        xp: u64,
        points: u32,
    },
    FishingTrawler,
    Nightmare {
        leader: UserId,
        users: Vec<UserId>,
    },
    Wintertodt,
    TitheFarm,
    Sepulchre {
        floors: Vec<u8>,
    },
    Plunder {
        rooms: Vec<u8>,
    },
    Zalcano {
        is_mvp: bool,
        performance: u32,
    },
    BarbarianAssault {
        leader: UserId,
        users: Vec<UserId>,
        total_level: u32,
    },
    AgilityArena,
    Sawmill {
        plank_id: ItemId,
        plank_quantity: u32,
    },
    GnomeRestaurant {
        glories_removed: u32,
    },
}

impl ActivityPayload {
    /// The discriminant of this payload.
    pub fn kind(&self) -> ActivityKind {
        match self {
            Self::GloryCharging => ActivityKind::GloryCharging,
            Self::Agility { .. } => ActivityKind::Agility,
            Self::Cooking { .. } => ActivityKind::Cooking,
            Self::Construction { .. } => ActivityKind::Construction,
            Self::MonsterKilling { .. } => ActivityKind::MonsterKilling,
            Self::ClueCompletion { .. } => ActivityKind::ClueCompletion,
            Self::Fishing { .. } => ActivityKind::Fishing,
            Self::Mining { .. } => ActivityKind::Mining,
            Self::Smelting { .. } => ActivityKind::Smelting,
            Self::Smithing { .. } => ActivityKind::Smithing,
            Self::Firemaking { .. } => ActivityKind::Firemaking,
            Self::Woodcutting { .. } => ActivityKind::Woodcutting,
            Self::Crafting { .. } => ActivityKind::Crafting,
            Self::Fletching { .. } => ActivityKind::Fletching,
            Self::Enchanting { .. } => ActivityKind::Enchanting,
            Self::Casting { .. } => ActivityKind::Casting,
            Self::Pickpocket { .. } => ActivityKind::Pickpocket,
            Self::Burying { .. } => ActivityKind::Burying,
            Self::Offering { .. } => ActivityKind::Offering,
            Self::Cyclops => ActivityKind::Cyclops,
            Self::AnimatedArmour { .. } => ActivityKind::AnimatedArmour,
            Self::Herblore { .. } => ActivityKind::Herblore,
            Self::Hunter { .. } => ActivityKind::Hunter,
            Self::Alching { .. } => ActivityKind::Alching,
            Self::FightCaves(_) => ActivityKind::FightCaves,
            Self::Questing => ActivityKind::Questing,
            Self::Farming(_) => ActivityKind::Farming,
            Self::Birdhouse { .. } => ActivityKind::Birdhouse,
            Self::AerialFishing => ActivityKind::AerialFishing,
            Self::MahoganyHomes { .. } => ActivityKind::MahoganyHomes,
            Self::FishingTrawler => ActivityKind::FishingTrawler,
            Self::Nightmare { .. } => ActivityKind::Nightmare,
            Self::Wintertodt => ActivityKind::Wintertodt,
            Self::TitheFarm => ActivityKind::TitheFarm,
            Self::Sepulchre { .. } => ActivityKind::Sepulchre,
            Self::Plunder { .. } => ActivityKind::Plunder,
            Self::Zalcano { .. } => ActivityKind::Zalcano,
            Self::BarbarianAssault { .. } => ActivityKind::BarbarianAssault,
            Self::AgilityArena => ActivityKind::AgilityArena,
            Self::Sawmill { .. } => ActivityKind::Sawmill,
            Self::GnomeRestaurant { .. } => ActivityKind::GnomeRestaurant,
        }
    }
}

/// Fight Caves trip, with every roll that can be made up front already made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightCavesPayload {
    /// Percent chance of dying to the boss, rolled at resolution.
    pub jad_death_chance: u32,
    /// Percent chance of dying before the boss (already rolled).
    pub pre_jad_death_chance: u32,
    /// When set, the minion died before the boss after this many milliseconds.
    pub pre_jad_death_time: Option<u64>,
}

/// One farming cycle on a single patch kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmingPayload {
    /// Plant to put in the ground, when planting.
    pub plant_name: Option<String>,
    /// Patch kind being worked.
    pub patch: PatchKind,
    /// Patch state at the time the cycle was started.
    pub patch_state: PatchState,
    /// Number of patches to plant.
    pub quantity: u32,
    /// Compost applied to the new planting.
    pub upgrade_tier: Option<CompostTier>,
    /// Whether a gardener was paid to protect the new planting.
    pub pay: bool,
    /// Whether new seeds are planted in this cycle.
    pub planting: bool,
}

/// Compost tiers, in increasing strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompostTier {
    Compost,
    Supercompost,
    Ultracompost,
}

impl CompostTier {
    /// Multiplier applied to a plant's chance of death.
    pub fn death_reduction(self) -> f64 {
        match self {
            Self::Compost => 1.0 / 2.0,
            Self::Supercompost => 1.0 / 5.0,
            Self::Ultracompost => 1.0 / 10.0,
        }
    }

    /// Lives added to the harvest lives loop.
    pub fn extra_lives(self) -> u32 {
        match self {
            Self::Compost => 1,
            Self::Supercompost => 2,
            Self::Ultracompost => 3,
        }
    }

    /// Farming XP per patch for applying this compost while planting.
    pub fn planting_xp(self) -> f64 {
        match self {
            Self::Compost => 18.0,
            Self::Supercompost => 26.0,
            Self::Ultracompost => 36.0,
        }
    }

    /// Bank item consumed per patch.
    pub fn item(self) -> ItemId {
        match self {
            Self::Compost => crate::content::items::COMPOST,
            Self::Supercompost => crate::content::items::SUPERCOMPOST,
            Self::Ultracompost => crate::content::items::ULTRACOMPOST,
        }
    }
}

/// Farming patch kinds; each is persisted under its own settings key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchKind {
    Herb,
    FruitTree,
    Tree,
    Allotment,
    Hops,
    Cactus,
    Bush,
    Spirit,
    Hardwood,
    Seaweed,
    Vine,
    Calquat,
    Redwood,
    Crystal,
    Celastrus,
    Hespori,
    Flower,
    Mushroom,
    Belladonna,
}

impl PatchKind {
    /// Settings key of this patch's [`PatchState`].
    pub fn setting_name(self) -> &'static str {
        match self {
            Self::Herb => "farmingPatches.herb",
            Self::FruitTree => "farmingPatches.fruit_tree",
            Self::Tree => "farmingPatches.tree",
            Self::Allotment => "farmingPatches.allotment",
            Self::Hops => "farmingPatches.hops",
            Self::Cactus => "farmingPatches.cactus",
            Self::Bush => "farmingPatches.bush",
            Self::Spirit => "farmingPatches.spirit",
            Self::Hardwood => "farmingPatches.hardwood",
            Self::Seaweed => "farmingPatches.seaweed",
            Self::Vine => "farmingPatches.vine",
            Self::Calquat => "farmingPatches.calquat",
            Self::Redwood => "farmingPatches.redwood",
            Self::Crystal => "farmingPatches.crystal",
            Self::Celastrus => "farmingPatches.celastrus",
            Self::Hespori => "farmingPatches.hespori",
            Self::Flower => "farmingPatches.flower",
            Self::Mushroom => "farmingPatches.mushroom",
            Self::Belladonna => "farmingPatches.belladonna",
        }
    }
}

/// Long-lived state of one farming patch.
///
/// `is_harvestable` means the patch holds a crop from a previous cycle; it
/// only flips when a farming task resolves successfully.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchState {
    pub last_planted: Option<String>,
    pub last_quantity: u32,
    pub last_upgrade_tier: Option<CompostTier>,
    pub last_payment: bool,
    pub is_harvestable: bool,
    /// Epoch milliseconds the current crop went into the ground.
    pub planted_at_ms: u64,
}
