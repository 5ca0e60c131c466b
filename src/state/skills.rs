//! Skills and the experience curve.

use serde::{Deserialize, Serialize};

/// Highest reachable level.
pub const MAX_LEVEL: u8 = 99;

/// Experience cap per skill.
pub const MAX_XP: u64 = 200_000_000;

/// The 23 trainable skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Attack,
    Defence,
    Strength,
    Hitpoints,
    Ranged,
    Prayer,
    Magic,
    Cooking,
    Woodcutting,
    Fletching,
    Fishing,
    Firemaking,
    Crafting,
    Smithing,
    Mining,
    Herblore,
    Agility,
    Thieving,
    Slayer,
    Farming,
    Runecraft,
    Hunter,
    Construction,
}

impl Skill {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Attack => "Attack",
            Self::Defence => "Defence",
            Self::Strength => "Strength",
            Self::Hitpoints => "Hitpoints",
            Self::Ranged => "Ranged",
            Self::Prayer => "Prayer",
            Self::Magic => "Magic",
            Self::Cooking => "Cooking",
            Self::Woodcutting => "Woodcutting",
            Self::Fletching => "Fletching",
            Self::Fishing => "Fishing",
            Self::Firemaking => "Firemaking",
            Self::Crafting => "Crafting",
            Self::Smithing => "Smithing",
            Self::Mining => "Mining",
            Self::Herblore => "Herblore",
            Self::Agility => "Agility",
            Self::Thieving => "Thieving",
            Self::Slayer => "Slayer",
            Self::Farming => "Farming",
            Self::Runecraft => "Runecraft",
            Self::Hunter => "Hunter",
            Self::Construction => "Construction",
        }
    }
}

impl std::fmt::Display for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Minimum experience needed for `level`.
pub fn xp_for_level(level: u8) -> u64 {
    let mut points = 0.0_f64;
    for n in 1..u32::from(level.clamp(1, MAX_LEVEL)) {
        let n = f64::from(n);
        points += (n + 300.0 * 2f64.powf(n / 7.0)).floor();
    }
    (points / 4.0).floor() as u64
}

/// Level reached with `xp` experience.
pub fn level_for_xp(xp: u64) -> u8 {
    let mut level = 1;
    while level < MAX_LEVEL && xp >= xp_for_level(level + 1) {
        level += 1;
    }
    level
}

/// Result of granting experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpGain {
    pub skill: Skill,
    pub amount: u64,
    pub before_level: u8,
    pub after_level: u8,
}

impl XpGain {
    /// Whether the grant crossed at least one level boundary.
    pub fn leveled_up(&self) -> bool {
        self.after_level > self.before_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_curve_points() {
        assert_eq!(xp_for_level(1), 0);
        assert_eq!(xp_for_level(2), 83);
        assert_eq!(xp_for_level(10), 1_154);
        assert_eq!(xp_for_level(43), 50_339);
        assert_eq!(xp_for_level(99), 13_034_431);
    }

    #[test]
    fn level_for_xp_boundaries() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(82), 1);
        assert_eq!(level_for_xp(83), 2);
        assert_eq!(level_for_xp(13_034_430), 98);
        assert_eq!(level_for_xp(13_034_431), 99);
        assert_eq!(level_for_xp(MAX_XP), 99);
    }

    #[test]
    fn level_round_trips_through_xp() {
        for level in 1..=MAX_LEVEL {
            assert_eq!(level_for_xp(xp_for_level(level)), level);
        }
    }
}
