//! In-process user state, for tests and the simulation binary.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::activity::UserId;
use crate::error::{ActivityError, Result};
use crate::state::skills::MAX_XP;
use crate::state::{EconomyCategory, LootBundle, Skill, UserStateStore, XpGain, level_for_xp};

#[derive(Debug, Default)]
struct UserRecord {
    settings: HashMap<String, serde_json::Value>,
    bank: LootBundle,
    xp: HashMap<Skill, u64>,
    currency: u64,
    kill_counts: HashMap<u32, u32>,
}

/// [`UserStateStore`] backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<UserId, UserRecord>>,
    economy: Mutex<HashMap<EconomyCategory, LootBundle>>,
}

impl InMemoryUserStore {
    /// Store with no users.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit in-game currency.
    pub async fn add_currency(&self, user: &UserId, amount: u64) {
        let mut users = self.users.lock().await;
        let record = users.entry(user.clone()).or_default();
        record.currency = record.currency.saturating_add(amount);
    }

    /// Aggregated cost recorded under `category` so far.
    pub async fn economy_total(&self, category: EconomyCategory) -> LootBundle {
        self.economy
            .lock()
            .await
            .get(&category)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl UserStateStore for InMemoryUserStore {
    async fn get_raw(&self, user: &UserId, key: &str) -> Result<Option<serde_json::Value>> {
        let users = self.users.lock().await;
        Ok(users
            .get(user)
            .and_then(|record| record.settings.get(key).cloned()))
    }

    async fn set_raw(&self, user: &UserId, key: &str, value: serde_json::Value) -> Result<()> {
        let mut users = self.users.lock().await;
        users
            .entry(user.clone())
            .or_default()
            .settings
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn bank(&self, user: &UserId) -> Result<LootBundle> {
        let users = self.users.lock().await;
        Ok(users
            .get(user)
            .map(|record| record.bank.clone())
            .unwrap_or_default())
    }

    async fn add_to_bank(&self, user: &UserId, loot: &LootBundle) -> Result<()> {
        let mut users = self.users.lock().await;
        users.entry(user.clone()).or_default().bank.merge(loot);
        Ok(())
    }

    async fn remove_from_bank(&self, user: &UserId, items: &LootBundle) -> Result<()> {
        let mut users = self.users.lock().await;
        let record = users.entry(user.clone()).or_default();
        record.bank.checked_remove(items).map_err(|missing| {
            ActivityError::InsufficientResources(format!(
                "bank is missing {} item type(s)",
                missing.len()
            ))
        })
    }

    async fn skill_xp(&self, user: &UserId, skill: Skill) -> Result<u64> {
        let users = self.users.lock().await;
        Ok(users
            .get(user)
            .and_then(|record| record.xp.get(&skill).copied())
            .unwrap_or(0))
    }

    async fn add_xp(&self, user: &UserId, skill: Skill, amount: u64) -> Result<XpGain> {
        let mut users = self.users.lock().await;
        let xp = users
            .entry(user.clone())
            .or_default()
            .xp
            .entry(skill)
            .or_insert(0);
        let before = *xp;
        *xp = before.saturating_add(amount).min(MAX_XP);
        Ok(XpGain {
            skill,
            amount: *xp - before,
            before_level: level_for_xp(before),
            after_level: level_for_xp(*xp),
        })
    }

    async fn currency(&self, user: &UserId) -> Result<u64> {
        let users = self.users.lock().await;
        Ok(users.get(user).map_or(0, |record| record.currency))
    }

    async fn remove_currency(&self, user: &UserId, amount: u64) -> Result<()> {
        let mut users = self.users.lock().await;
        let record = users.entry(user.clone()).or_default();
        if record.currency < amount {
            return Err(ActivityError::InsufficientResources(format!(
                "needs {amount} coins, has {}",
                record.currency
            )));
        }
        record.currency -= amount;
        Ok(())
    }

    async fn kill_count(&self, user: &UserId, monster_id: u32) -> Result<u32> {
        let users = self.users.lock().await;
        Ok(users
            .get(user)
            .and_then(|record| record.kill_counts.get(&monster_id).copied())
            .unwrap_or(0))
    }

    async fn increment_kill_count(
        &self,
        user: &UserId,
        monster_id: u32,
        amount: u32,
    ) -> Result<u32> {
        let mut users = self.users.lock().await;
        let count = users
            .entry(user.clone())
            .or_default()
            .kill_counts
            .entry(monster_id)
            .or_insert(0);
        *count = count.saturating_add(amount);
        Ok(*count)
    }

    async fn record_economy_cost(
        &self,
        category: EconomyCategory,
        cost: &LootBundle,
    ) -> Result<()> {
        self.economy
            .lock()
            .await
            .entry(category)
            .or_default()
            .merge(cost);
        Ok(())
    }
}

/// [`InMemoryUserStore`] whose global economy statistics are unreachable.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct EconomyOffline(pub(crate) InMemoryUserStore);

#[cfg(test)]
#[async_trait]
impl UserStateStore for EconomyOffline {
    async fn get_raw(&self, user: &UserId, key: &str) -> Result<Option<serde_json::Value>> {
        self.0.get_raw(user, key).await
    }

    async fn set_raw(&self, user: &UserId, key: &str, value: serde_json::Value) -> Result<()> {
        self.0.set_raw(user, key, value).await
    }

    async fn bank(&self, user: &UserId) -> Result<LootBundle> {
        self.0.bank(user).await
    }

    async fn add_to_bank(&self, user: &UserId, loot: &LootBundle) -> Result<()> {
        self.0.add_to_bank(user, loot).await
    }

    async fn remove_from_bank(&self, user: &UserId, items: &LootBundle) -> Result<()> {
        self.0.remove_from_bank(user, items).await
    }

    async fn skill_xp(&self, user: &UserId, skill: Skill) -> Result<u64> {
        self.0.skill_xp(user, skill).await
    }

    async fn add_xp(&self, user: &UserId, skill: Skill, amount: u64) -> Result<XpGain> {
        self.0.add_xp(user, skill, amount).await
    }

    async fn currency(&self, user: &UserId) -> Result<u64> {
        self.0.currency(user).await
    }

    async fn remove_currency(&self, user: &UserId, amount: u64) -> Result<()> {
        self.0.remove_currency(user, amount).await
    }

    async fn kill_count(&self, user: &UserId, monster_id: u32) -> Result<u32> {
        self.0.kill_count(user, monster_id).await
    }

    async fn increment_kill_count(
        &self,
        user: &UserId,
        monster_id: u32,
        amount: u32,
    ) -> Result<u32> {
        self.0.increment_kill_count(user, monster_id, amount).await
    }

    async fn record_economy_cost(&self, _: EconomyCategory, _: &LootBundle) -> Result<()> {
        Err(ActivityError::Store("economy stats offline".to_owned()))
    }
}
