//! Item quantity bundles (banks and loot).

use crate::content::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Item → count mapping. Entries are never zero or negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LootBundle {
    items: BTreeMap<ItemId, u64>,
}

impl LootBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` of `item`. Zero quantities are ignored.
    pub fn add(&mut self, item: ItemId, quantity: u64) {
        if quantity == 0 {
            return;
        }
        let entry = self.items.entry(item).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    /// Replace the amount of `item`; zero removes the entry.
    pub fn set(&mut self, item: ItemId, quantity: u64) {
        if quantity == 0 {
            self.items.remove(&item);
        } else {
            self.items.insert(item, quantity);
        }
    }

    /// Add every entry of `other` to this bundle.
    pub fn merge(&mut self, other: &LootBundle) {
        for (item, quantity) in other.iter() {
            self.add(item, quantity);
        }
    }

    /// Quantity of `item`, zero if absent.
    pub fn amount(&self, item: ItemId) -> u64 {
        self.items.get(&item).copied().unwrap_or(0)
    }

    /// Whether at least `quantity` of `item` is present.
    pub fn has(&self, item: ItemId, quantity: u64) -> bool {
        self.amount(item) >= quantity
    }

    /// Returns `true` if this bundle covers every entry of `other`.
    pub fn has_all(&self, other: &LootBundle) -> bool {
        other.iter().all(|(item, quantity)| self.has(item, quantity))
    }

    /// Entries of `other` this bundle cannot cover, with the missing amounts.
    pub fn shortfall(&self, other: &LootBundle) -> LootBundle {
        let mut missing = LootBundle::new();
        for (item, quantity) in other.iter() {
            missing.add(item, quantity.saturating_sub(self.amount(item)));
        }
        missing
    }

    /// Subtract `other`, leaving this bundle untouched if it falls short.
    ///
    /// On failure the shortfall is returned.
    pub fn checked_remove(&mut self, other: &LootBundle) -> Result<(), LootBundle> {
        if !self.has_all(other) {
            return Err(self.shortfall(other));
        }
        for (item, quantity) in other.iter() {
            let remaining = self.amount(item) - quantity;
            self.set(item, remaining);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Entries in ascending item id order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, u64)> + '_ {
        self.items.iter().map(|(item, quantity)| (*item, *quantity))
    }
}

impl FromIterator<(ItemId, u64)> for LootBundle {
    fn from_iter<I: IntoIterator<Item = (ItemId, u64)>>(iter: I) -> Self {
        let mut bundle = LootBundle::new();
        for (item, quantity) in iter {
            bundle.add(item, quantity);
        }
        bundle
    }
}

impl<const N: usize> From<[(ItemId, u64); N]> for LootBundle {
    fn from(entries: [(ItemId, u64); N]) -> Self {
        entries.into_iter().collect()
    }
}
