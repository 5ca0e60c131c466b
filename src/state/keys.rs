//! Typed user-setting keys.
//!
//! A [`SettingKey`] pairs a namespaced key with the Rust type stored under
//! it, so reads and writes cannot disagree about the value's shape.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::activity::{PatchKind, PatchState, UserId};
use crate::error::Result;
use crate::state::UserStateStore;
use crate::state::gear::{GearSetup, GearSlot};

/// A key whose value deserializes into `T`.
pub struct SettingKey<T> {
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for SettingKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SettingKey<T> {}

impl<T> std::fmt::Debug for SettingKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SettingKey").field(&self.name).finish()
    }
}

impl<T> SettingKey<T> {
    /// Key stored under `name` in the user's settings.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> SettingKey<T>
where
    T: DeserializeOwned + Serialize + Default + Sync,
{
    /// Read the value, or `T::default()` when the key was never written.
    pub async fn load<S>(&self, store: &S, user: &UserId) -> Result<T>
    where
        S: UserStateStore + ?Sized,
    {
        match store.get_raw(user, self.name).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(T::default()),
        }
    }

    /// Overwrite the stored value.
    pub async fn store<S>(&self, store: &S, user: &UserId, value: &T) -> Result<()>
    where
        S: UserStateStore + ?Sized,
    {
        let raw = serde_json::to_value(value)?;
        store.set_raw(user, self.name, raw).await
    }
}

/// Farming Guild contract progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmingContract {
    /// Plant the contract asks for, if one is active.
    pub plant_to_grow: Option<String>,
    pub plant_tier: u8,
    pub difficulty_level: Option<String>,
    pub contracts_completed: u32,
    /// Tier of the next seed pack reward.
    pub seed_pack_tier: u8,
}

/// Completed Fight Caves attempts, whatever their outcome.
pub const FIGHT_CAVES_ATTEMPTS: SettingKey<u32> = SettingKey::new("stats.fightCavesAttempts");
/// Custom minion name; `None` uses the default.
pub const MINION_NAME: SettingKey<Option<String>> = SettingKey::new("minion.name");
/// Milliseconds of minion activity completed today.
pub const DAILY_DURATION: SettingKey<u64> = SettingKey::new("minion.dailyDuration");
pub const FARMING_CONTRACT: SettingKey<FarmingContract> =
    SettingKey::new("minion.farmingContract");

pub const GEAR_MELEE: SettingKey<GearSetup> = SettingKey::new("gear.melee");
pub const GEAR_RANGE: SettingKey<GearSetup> = SettingKey::new("gear.range");
pub const GEAR_MAGE: SettingKey<GearSetup> = SettingKey::new("gear.mage");
pub const GEAR_MISC: SettingKey<GearSetup> = SettingKey::new("gear.misc");
pub const GEAR_SKILLING: SettingKey<GearSetup> = SettingKey::new("gear.skilling");

/// Setting key of the gear setup in `slot`.
pub fn gear(slot: GearSlot) -> SettingKey<GearSetup> {
    match slot {
        GearSlot::Melee => GEAR_MELEE,
        GearSlot::Range => GEAR_RANGE,
        GearSlot::Mage => GEAR_MAGE,
        GearSlot::Misc => GEAR_MISC,
        GearSlot::Skilling => GEAR_SKILLING,
    }
}

/// Setting key of the state of every patch of `kind`.
pub fn farming_patch(kind: PatchKind) -> SettingKey<PatchState> {
    SettingKey::new(kind.setting_name())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::state::InMemoryUserStore;

    #[tokio::test]
    async fn absent_keys_load_defaults() {
        let store = InMemoryUserStore::new();
        let user = UserId::new("u1");
        assert_eq!(FIGHT_CAVES_ATTEMPTS.load(&store, &user).await.unwrap(), 0);
        assert_eq!(
            farming_patch(PatchKind::Herb).load(&store, &user).await.unwrap(),
            PatchState::default()
        );
    }

    #[tokio::test]
    async fn stored_values_are_per_user() {
        let store = InMemoryUserStore::new();
        let a = UserId::new("a");
        let b = UserId::new("b");
        FIGHT_CAVES_ATTEMPTS.store(&store, &a, &3).await.unwrap();
        assert_eq!(FIGHT_CAVES_ATTEMPTS.load(&store, &a).await.unwrap(), 3);
        assert_eq!(FIGHT_CAVES_ATTEMPTS.load(&store, &b).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mistyped_value_is_a_serialization_error() {
        let store = InMemoryUserStore::new();
        let user = UserId::new("u1");
        store
            .set_raw(&user, FIGHT_CAVES_ATTEMPTS.name(), serde_json::json!("three"))
            .await
            .unwrap();
        let err = FIGHT_CAVES_ATTEMPTS.load(&store, &user).await.unwrap_err();
        assert!(matches!(err, crate::error::ActivityError::Serialization(_)));
    }

    #[test]
    fn gear_keys_are_distinct() {
        let mut names: Vec<_> = GearSlot::ALL.iter().map(|s| gear(*s).name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 5);
    }
}
