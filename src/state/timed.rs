//! Per-call deadline on an inner [`UserStateStore`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::activity::UserId;
use crate::error::{ActivityError, Result};
use crate::state::{EconomyCategory, LootBundle, Skill, UserStateStore, XpGain};

/// Fails any call that outlives `timeout` with [`ActivityError::Timeout`].
///
/// A timed-out mutation may still land in the inner store; callers treat
/// the timeout as a fault, not as a rollback.
#[derive(Clone)]
pub struct TimedStateStore {
    inner: Arc<dyn UserStateStore>,
    timeout: Duration,
}

impl TimedStateStore {
    /// Wrap `inner`, bounding each call by `timeout`.
    pub fn new(inner: Arc<dyn UserStateStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn timed<T, F>(&self, op: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ActivityError::Timeout(format!(
                "state store {op} after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl UserStateStore for TimedStateStore {
    async fn get_raw(&self, user: &UserId, key: &str) -> Result<Option<serde_json::Value>> {
        self.timed("get", self.inner.get_raw(user, key)).await
    }

    async fn set_raw(&self, user: &UserId, key: &str, value: serde_json::Value) -> Result<()> {
        self.timed("set", self.inner.set_raw(user, key, value)).await
    }

    async fn bank(&self, user: &UserId) -> Result<LootBundle> {
        self.timed("bank", self.inner.bank(user)).await
    }

    async fn add_to_bank(&self, user: &UserId, loot: &LootBundle) -> Result<()> {
        self.timed("add_to_bank", self.inner.add_to_bank(user, loot))
            .await
    }

    async fn remove_from_bank(&self, user: &UserId, items: &LootBundle) -> Result<()> {
        self.timed("remove_from_bank", self.inner.remove_from_bank(user, items))
            .await
    }

    async fn skill_xp(&self, user: &UserId, skill: Skill) -> Result<u64> {
        self.timed("skill_xp", self.inner.skill_xp(user, skill))
            .await
    }

    async fn add_xp(&self, user: &UserId, skill: Skill, amount: u64) -> Result<XpGain> {
        self.timed("add_xp", self.inner.add_xp(user, skill, amount))
            .await
    }

    async fn currency(&self, user: &UserId) -> Result<u64> {
        self.timed("currency", self.inner.currency(user)).await
    }

    async fn remove_currency(&self, user: &UserId, amount: u64) -> Result<()> {
        self.timed("remove_currency", self.inner.remove_currency(user, amount))
            .await
    }

    async fn kill_count(&self, user: &UserId, monster_id: u32) -> Result<u32> {
        self.timed("kill_count", self.inner.kill_count(user, monster_id))
            .await
    }

    async fn increment_kill_count(
        &self,
        user: &UserId,
        monster_id: u32,
        amount: u32,
    ) -> Result<u32> {
        self.timed(
            "increment_kill_count",
            self.inner.increment_kill_count(user, monster_id, amount),
        )
        .await
    }

    async fn record_economy_cost(
        &self,
        category: EconomyCategory,
        cost: &LootBundle,
    ) -> Result<()> {
        self.timed(
            "record_economy_cost",
            self.inner.record_economy_cost(category, cost),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::state::InMemoryUserStore;

    struct StalledStore;

    #[async_trait]
    impl UserStateStore for StalledStore {
        async fn get_raw(&self, _: &UserId, _: &str) -> Result<Option<serde_json::Value>> {
            std::future::pending().await
        }
        async fn set_raw(&self, _: &UserId, _: &str, _: serde_json::Value) -> Result<()> {
            std::future::pending().await
        }
        async fn bank(&self, _: &UserId) -> Result<LootBundle> {
            std::future::pending().await
        }
        async fn add_to_bank(&self, _: &UserId, _: &LootBundle) -> Result<()> {
            std::future::pending().await
        }
        async fn remove_from_bank(&self, _: &UserId, _: &LootBundle) -> Result<()> {
            std::future::pending().await
        }
        async fn skill_xp(&self, _: &UserId, _: Skill) -> Result<u64> {
            std::future::pending().await
        }
        async fn add_xp(&self, _: &UserId, _: Skill, _: u64) -> Result<XpGain> {
            std::future::pending().await
        }
        async fn currency(&self, _: &UserId) -> Result<u64> {
            std::future::pending().await
        }
        async fn remove_currency(&self, _: &UserId, _: u64) -> Result<()> {
            std::future::pending().await
        }
        async fn kill_count(&self, _: &UserId, _: u32) -> Result<u32> {
            std::future::pending().await
        }
        async fn increment_kill_count(&self, _: &UserId, _: u32, _: u32) -> Result<u32> {
            std::future::pending().await
        }
        async fn record_economy_cost(&self, _: EconomyCategory, _: &LootBundle) -> Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_call_times_out() {
        let store = TimedStateStore::new(Arc::new(StalledStore), Duration::from_millis(50));
        let err = store.bank(&UserId::new("u1")).await.unwrap_err();
        assert!(matches!(err, ActivityError::Timeout(_)));
        assert!(!err.is_user_facing());
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let inner = Arc::new(InMemoryUserStore::new());
        let store = TimedStateStore::new(inner.clone(), Duration::from_secs(1));
        let user = UserId::new("u1");
        store.add_xp(&user, Skill::Prayer, 100).await.unwrap();
        assert_eq!(inner.skill_xp(&user, Skill::Prayer).await.unwrap(), 100);
        assert_eq!(store.skill_level(&user, Skill::Prayer).await.unwrap(), 2);
    }
}
