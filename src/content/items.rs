//! Item and monster identifiers referenced by the built-in handlers.

use serde::{Deserialize, Serialize};

/// Game item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const COINS: ItemId = ItemId(995);
pub const WEEDS: ItemId = ItemId(6055);
pub const TOKKUL: ItemId = ItemId(6529);
pub const FIRE_CAPE: ItemId = ItemId(6570);
pub const TZREK_JAD: ItemId = ItemId(13225);

pub const PRAYER_POTION_4: ItemId = ItemId(2434);
pub const SARADOMIN_BREW_4: ItemId = ItemId(6685);
pub const SUPER_RESTORE_4: ItemId = ItemId(3024);
pub const SARADOMIN_GODSWORD: ItemId = ItemId(11806);
pub const RUNE_CROSSBOW: ItemId = ItemId(9185);

pub const COMPOST: ItemId = ItemId(6032);
pub const SUPERCOMPOST: ItemId = ItemId(6034);
pub const ULTRACOMPOST: ItemId = ItemId(21483);
pub const SEED_PACK: ItemId = ItemId(22993);
pub const TANGLEROOT: ItemId = ItemId(20661);
pub const MAGIC_SECATEURS: ItemId = ItemId(7409);
pub const FARMING_CAPE: ItemId = ItemId(9810);
pub const FARMING_CAPE_T: ItemId = ItemId(9811);
pub const FARMERS_STRAWHAT: ItemId = ItemId(13646);
pub const FARMERS_JACKET: ItemId = ItemId(13642);
pub const FARMERS_SHIRT: ItemId = ItemId(13643);
pub const FARMERS_BORO_TROUSERS: ItemId = ItemId(13640);
pub const FARMERS_BOOTS: ItemId = ItemId(13644);

pub const GUAM_SEED: ItemId = ItemId(5291);
pub const GRIMY_GUAM_LEAF: ItemId = ItemId(199);
pub const POTATO_SEED: ItemId = ItemId(5318);
pub const POTATO: ItemId = ItemId(1942);
pub const REDBERRY_SEED: ItemId = ItemId(5101);
pub const REDBERRIES: ItemId = ItemId(1951);
pub const ACORN: ItemId = ItemId(5312);
pub const OAK_LOGS: ItemId = ItemId(1521);
pub const LIMPWURT_SEED: ItemId = ItemId(5100);
pub const LIMPWURT_ROOT: ItemId = ItemId(225);
pub const CRYSTAL_ACORN: ItemId = ItemId(23661);
pub const CRYSTAL_SHARD: ItemId = ItemId(23962);
pub const CELASTRUS_SEED: ItemId = ItemId(22869);
pub const BATTLESTAFF: ItemId = ItemId(1391);
pub const HESPORI_SEED: ItemId = ItemId(22875);
pub const ATTAS_SEED: ItemId = ItemId(22881);
pub const IASOR_SEED: ItemId = ItemId(22883);
pub const KRONOS_SEED: ItemId = ItemId(22885);
pub const BOTTOMLESS_COMPOST_BUCKET: ItemId = ItemId(22994);

// Gardener protection payments.
pub const TOMATOES_5: ItemId = ItemId(5968);
pub const CABBAGES_10: ItemId = ItemId(5478);
pub const POTATO_CACTUS: ItemId = ItemId(3138);

/// Monster identifiers used for kill counts.
pub mod monsters {
    pub const TZTOK_JAD: u32 = 3127;
    pub const HESPORI: u32 = 8583;
}

const NAMES: &[(ItemId, &str)] = &[
    (COINS, "Coins"),
    (WEEDS, "Weeds"),
    (TOKKUL, "Tokkul"),
    (FIRE_CAPE, "Fire cape"),
    (TZREK_JAD, "Tzrek-jad"),
    (PRAYER_POTION_4, "Prayer potion(4)"),
    (SARADOMIN_BREW_4, "Saradomin brew(4)"),
    (SUPER_RESTORE_4, "Super restore(4)"),
    (SARADOMIN_GODSWORD, "Saradomin godsword"),
    (RUNE_CROSSBOW, "Rune crossbow"),
    (COMPOST, "Compost"),
    (SUPERCOMPOST, "Supercompost"),
    (ULTRACOMPOST, "Ultracompost"),
    (SEED_PACK, "Seed pack"),
    (TANGLEROOT, "Tangleroot"),
    (MAGIC_SECATEURS, "Magic secateurs"),
    (FARMING_CAPE, "Farming cape"),
    (FARMING_CAPE_T, "Farming cape(t)"),
    (FARMERS_STRAWHAT, "Farmer's strawhat"),
    (FARMERS_JACKET, "Farmer's jacket"),
    (FARMERS_SHIRT, "Farmer's shirt"),
    (FARMERS_BORO_TROUSERS, "Farmer's boro trousers"),
    (FARMERS_BOOTS, "Farmer's boots"),
    (GUAM_SEED, "Guam seed"),
    (GRIMY_GUAM_LEAF, "Grimy guam leaf"),
    (POTATO_SEED, "Potato seed"),
    (POTATO, "Potato"),
    (REDBERRY_SEED, "Redberry seed"),
    (REDBERRIES, "Redberries"),
    (ACORN, "Acorn"),
    (OAK_LOGS, "Oak logs"),
    (LIMPWURT_SEED, "Limpwurt seed"),
    (LIMPWURT_ROOT, "Limpwurt root"),
    (CRYSTAL_ACORN, "Crystal acorn"),
    (CRYSTAL_SHARD, "Crystal shard"),
    (CELASTRUS_SEED, "Celastrus seed"),
    (BATTLESTAFF, "Battlestaff"),
    (HESPORI_SEED, "Hespori seed"),
    (ATTAS_SEED, "Attas seed"),
    (IASOR_SEED, "Iasor seed"),
    (KRONOS_SEED, "Kronos seed"),
    (BOTTOMLESS_COMPOST_BUCKET, "Bottomless compost bucket"),
    (TOMATOES_5, "Tomatoes(5)"),
    (CABBAGES_10, "Cabbages(10)"),
    (POTATO_CACTUS, "Potato cactus"),
];

/// Display name of a known item.
pub fn name(id: ItemId) -> Option<&'static str> {
    NAMES
        .iter()
        .find(|(item, _)| *item == id)
        .map(|(_, name)| *name)
}
