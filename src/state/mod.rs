//! Persistent user state.
//!
//! Handlers never touch storage directly: they go through
//! [`UserStateStore`], which owns banks, experience, kill counts and the
//! namespaced settings addressed by [`keys::SettingKey`].

pub mod bank;
pub mod gear;
pub mod keys;
pub mod memory;
pub mod skills;
pub mod timed;

pub use bank::LootBundle;
pub use gear::{GearSetup, GearSlot, GearStats, Weapon, WeaponClass};
pub use keys::{FarmingContract, SettingKey};
pub use memory::InMemoryUserStore;
pub use skills::{Skill, XpGain, level_for_xp, xp_for_level};
pub use timed::TimedStateStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::activity::UserId;
use crate::error::Result;

/// Buckets of the process-wide economy statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EconomyCategory {
    /// Supplies taken for Fight Caves attempts.
    FightCavesCost,
    /// Seeds, compost and gardener payments taken for farming cycles.
    FarmingCost,
}

/// Storage boundary for everything a handler reads or mutates.
///
/// Every mutation is atomic per call. Implementations must be safe to share
/// across concurrently resolving tasks of different users.
#[async_trait]
pub trait UserStateStore: Send + Sync {
    /// Setting stored under `key`, or `None` if never written.
    async fn get_raw(&self, user: &UserId, key: &str) -> Result<Option<serde_json::Value>>;

    /// Overwrite the setting stored under `key`.
    async fn set_raw(&self, user: &UserId, key: &str, value: serde_json::Value) -> Result<()>;

    /// Snapshot of the user's bank.
    async fn bank(&self, user: &UserId) -> Result<LootBundle>;

    /// Credit every item in `loot`.
    async fn add_to_bank(&self, user: &UserId, loot: &LootBundle) -> Result<()>;

    /// Remove `items`, failing with `InsufficientResources` and changing
    /// nothing if the bank cannot cover them.
    async fn remove_from_bank(&self, user: &UserId, items: &LootBundle) -> Result<()>;

    /// Total experience in `skill`.
    async fn skill_xp(&self, user: &UserId, skill: Skill) -> Result<u64>;

    /// Grant `amount` XP, capped at the maximum, reporting any level change.
    async fn add_xp(&self, user: &UserId, skill: Skill, amount: u64) -> Result<XpGain>;

    /// Coins held outside the bank.
    async fn currency(&self, user: &UserId) -> Result<u64>;

    /// Debit coins, failing with `InsufficientResources` and changing
    /// nothing if the user cannot cover `amount`.
    async fn remove_currency(&self, user: &UserId, amount: u64) -> Result<()>;

    /// Kills of `monster_id` so far.
    async fn kill_count(&self, user: &UserId, monster_id: u32) -> Result<u32>;

    /// Add `amount` kills of `monster_id`. Returns the new kill count.
    async fn increment_kill_count(&self, user: &UserId, monster_id: u32, amount: u32)
    -> Result<u32>;

    /// Fold `cost` into the global aggregate for `category`.
    async fn record_economy_cost(&self, category: EconomyCategory, cost: &LootBundle)
    -> Result<()>;

    /// Level derived from [`skill_xp`](Self::skill_xp).
    async fn skill_level(&self, user: &UserId, skill: Skill) -> Result<u8> {
        Ok(level_for_xp(self.skill_xp(user, skill).await?))
    }
}
