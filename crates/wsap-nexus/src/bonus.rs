//! Starting bonuses granted on transit, derived from skill levels
//!
//! The table is static data: per game, a list of skill domain to bonus rules.

use crate::identity::Skills;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A skill must exceed this level before it earns a bonus
pub const BONUS_THRESHOLD: f64 = 0.1;

/// Bonuses granted for one transit, in rule order
pub type Bonuses = serde_json::Map<String, serde_json::Value>;

/// Monotonic map from a skill level to a bonus value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// `base + int(level * factor)`
    Tiered { base: i64, factor: f64 },
    /// `level > above`
    Flag { above: f64 },
    /// `base + level * slope`
    Linear { base: f64, slope: f64 },
}

impl Transform {
    pub fn apply(&self, level: f64) -> serde_json::Value {
        match self {
            // Truncation toward zero matches int() on non-negative levels
            Transform::Tiered { base, factor } => (base + (level * factor) as i64).into(),
            Transform::Flag { above } => (level > *above).into(),
            Transform::Linear { base, slope } => (base + level * slope).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusRule {
    pub skill: String,
    pub bonus: String,
    pub transform: Transform,
}

impl BonusRule {
    fn new(skill: &str, bonus: &str, transform: Transform) -> Self {
        Self {
            skill: skill.to_string(),
            bonus: bonus.to_string(),
            transform,
        }
    }
}

/// Per-game bonus rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusTable {
    pub games: BTreeMap<String, Vec<BonusRule>>,
}

impl Default for BonusTable {
    fn default() -> Self {
        let mut games = BTreeMap::new();
        games.insert(
            "crafter".to_string(),
            vec![
                BonusRule::new(
                    "resource_management",
                    "inventory_bonus",
                    Transform::Tiered { base: 0, factor: 3.0 },
                ),
                BonusRule::new(
                    "survival",
                    "health_bonus",
                    Transform::Tiered { base: 0, factor: 2.0 },
                ),
                BonusRule::new("crafting", "recipe_hint", Transform::Flag { above: 0.3 }),
            ],
        );
        games.insert(
            "starbound".to_string(),
            vec![
                BonusRule::new(
                    "exploration",
                    "scanner_range",
                    Transform::Tiered { base: 1, factor: 5.0 },
                ),
                BonusRule::new(
                    "combat",
                    "weapon_tier",
                    Transform::Tiered { base: 1, factor: 2.0 },
                ),
                BonusRule::new(
                    "social",
                    "price_modifier",
                    Transform::Linear { base: 1.0, slope: -0.2 },
                ),
            ],
        );
        Self { games }
    }
}

impl BonusTable {
    pub fn empty() -> Self {
        Self {
            games: BTreeMap::new(),
        }
    }

    /// Bonuses for entering `game_id` with `skills`; games without rules grant none
    pub fn compute(&self, skills: &Skills, game_id: &str) -> Bonuses {
        let mut bonuses = Bonuses::new();
        let Some(rules) = self.games.get(game_id) else {
            return bonuses;
        };
        for rule in rules {
            if let Some(level) = skills.get(&rule.skill).copied() {
                if level > BONUS_THRESHOLD {
                    bonuses.insert(rule.bonus.clone(), rule.transform.apply(level));
                }
            }
        }
        bonuses
    }
}
