//! Equipped gear setups.

use crate::content::ItemId;
use serde::{Deserialize, Serialize};

/// Attack style family of a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponClass {
    Melee,
    Crossbow,
    Bow,
    Thrown,
    Staff,
}

impl WeaponClass {
    /// Bows and crossbows, the weapons accepted for Fight Caves.
    pub fn is_ranged_launcher(self) -> bool {
        matches!(self, Self::Crossbow | Self::Bow)
    }
}

/// Wielded weapon of a setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub item: ItemId,
    pub class: WeaponClass,
}

/// Summed equipment bonuses of a setup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearStats {
    pub attack_ranged: i32,
    pub attack_magic: i32,
    pub melee_strength: i32,
}

/// One saved gear setup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearSetup {
    pub weapon: Option<Weapon>,
    /// Every worn item, weapon included.
    pub equipped: Vec<ItemId>,
    pub stats: GearStats,
}

impl GearSetup {
    /// Whether `item` is worn anywhere in this setup.
    pub fn has_equipped(&self, item: ItemId) -> bool {
        self.equipped.contains(&item)
    }
}

/// The five setups a user keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GearSlot {
    Melee,
    Range,
    Mage,
    Misc,
    Skilling,
}

impl GearSlot {
    pub const ALL: [GearSlot; 5] = [
        GearSlot::Melee,
        GearSlot::Range,
        GearSlot::Mage,
        GearSlot::Misc,
        GearSlot::Skilling,
    ];
}
