//! The Crafter engine seam and a small in-memory engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wsap_core::{Inventory, Result, WsapError};

/// Achievement names tracked by Crafter
pub const ACHIEVEMENTS: [&str; 22] = [
    "collect_coal",
    "collect_diamond",
    "collect_drink",
    "collect_iron",
    "collect_sapling",
    "collect_stone",
    "collect_wood",
    "defeat_skeleton",
    "defeat_zombie",
    "eat_cow",
    "eat_plant",
    "make_iron_pickaxe",
    "make_iron_sword",
    "make_stone_pickaxe",
    "make_stone_sword",
    "make_wood_pickaxe",
    "make_wood_sword",
    "place_furnace",
    "place_plant",
    "place_stone",
    "place_table",
    "wake_up",
];

/// Engine state as reported after a reset or a step.
///
/// Fields are optional on the wire; the adapter refuses to observe when a
/// required one is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrafterInfo {
    /// Survival stats then items, both keyed by name, in engine order
    #[serde(default)]
    pub inventory: Option<Inventory>,
    /// Unlock counts
    #[serde(default)]
    pub achievements: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    pub player_pos: Option<[i64; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrafterStep {
    pub reward: f64,
    pub done: bool,
    pub info: CrafterInfo,
}

/// A Crafter world the adapter can drive.
///
/// Actions are addressed by their index in the Crafter action table.
pub trait CrafterEngine: Send {
    fn reset(&mut self) -> Result<CrafterInfo>;

    fn step(&mut self, action: usize) -> Result<CrafterStep>;
}

const WORLD_SIZE: i64 = 64;
const MAX_STAT: i64 = 9;
const NEED_DECAY_EVERY: u64 = 25;
const ENERGY_DECAY_EVERY: u64 = 30;
const EPISODE_LENGTH: u64 = 10_000;

const STATS: [&str; 4] = ["health", "food", "drink", "energy"];

const ITEMS: [&str; 12] = [
    "sapling",
    "wood",
    "stone",
    "coal",
    "iron",
    "diamond",
    "wood_pickaxe",
    "stone_pickaxe",
    "iron_pickaxe",
    "wood_sword",
    "stone_sword",
    "iron_sword",
];

/// Deterministic Crafter-like world for demos and tests.
///
/// What the player faces depends only on its position: trees, water, stone and
/// grazing cows repeat along the diagonals. Food and drink drop every 25 steps,
/// energy every 30, and an empty need costs health at each decay tick.
#[derive(Debug, Clone)]
pub struct MockCrafter {
    stats: BTreeMap<&'static str, i64>,
    items: BTreeMap<&'static str, i64>,
    achievements: BTreeMap<&'static str, u32>,
    position: [i64; 2],
    table: bool,
    furnace: bool,
    steps: u64,
}

impl Default for MockCrafter {
    fn default() -> Self {
        let mut world = Self {
            stats: BTreeMap::new(),
            items: BTreeMap::new(),
            achievements: BTreeMap::new(),
            position: [32, 32],
            table: false,
            furnace: false,
            steps: 0,
        };
        world.restart();
        world
    }
}

enum Facing {
    Tree,
    Water,
    Stone,
    Cow,
}

impl MockCrafter {
    pub fn new() -> Self {
        Self::default()
    }

    fn restart(&mut self) {
        self.stats = STATS
            .into_iter()
            .map(|s| (s, MAX_STAT))
            .collect();
        self.items = ITEMS.into_iter().map(|i| (i, 0)).collect();
        self.achievements = ACHIEVEMENTS.into_iter().map(|a| (a, 0)).collect();
        self.position = [32, 32];
        self.table = false;
        self.furnace = false;
        self.steps = 0;
    }

    fn info(&self) -> CrafterInfo {
        let inventory = STATS
            .into_iter()
            .map(|s| (s, self.stats.get(s).copied().unwrap_or(0)))
            .chain(ITEMS.into_iter().map(|i| (i, self.item(i))))
            .map(|(k, v)| (k.to_string(), v.into()))
            .collect();
        CrafterInfo {
            inventory: Some(inventory),
            achievements: Some(self.achievements.iter().map(|(k, v)| (k.to_string(), *v)).collect()),
            player_pos: Some(self.position),
        }
    }

    fn facing(&self) -> Facing {
        match (self.position[0] + self.position[1]).rem_euclid(4) {
            0 => Facing::Tree,
            1 => Facing::Water,
            2 => Facing::Stone,
            _ => Facing::Cow,
        }
    }

    fn item(&self, name: &str) -> i64 {
        self.items.get(name).copied().unwrap_or(0)
    }

    fn add(&mut self, name: &'static str, delta: i64) {
        *self.items.entry(name).or_insert(0) += delta;
    }

    fn stat_mut(&mut self, name: &'static str) -> &mut i64 {
        self.stats.entry(name).or_insert(0)
    }

    fn unlock(&mut self, name: &'static str) {
        *self.achievements.entry(name).or_insert(0) += 1;
    }

    fn interact(&mut self) {
        match self.facing() {
            Facing::Tree => {
                self.add("wood", 1);
                self.unlock("collect_wood");
                if self.steps % 10 == 0 {
                    self.add("sapling", 1);
                    self.unlock("collect_sapling");
                }
            }
            Facing::Water => {
                let drink = self.stat_mut("drink");
                *drink = (*drink + 1).min(MAX_STAT);
                self.unlock("collect_drink");
            }
            Facing::Stone => {
                if self.item("stone_pickaxe") > 0 && self.steps % 5 == 0 {
                    self.add("iron", 1);
                    self.unlock("collect_iron");
                } else if self.item("wood_pickaxe") > 0 && self.steps % 3 == 0 {
                    self.add("coal", 1);
                    self.unlock("collect_coal");
                } else if self.item("wood_pickaxe") > 0 {
                    self.add("stone", 1);
                    self.unlock("collect_stone");
                }
            }
            Facing::Cow => {
                let food = self.stat_mut("food");
                *food = (*food + 6).min(MAX_STAT);
                self.unlock("eat_cow");
            }
        }
    }

    // `achievement` is `make_<tool>`
    fn craft(&mut self, achievement: &'static str, needs: &[(&'static str, i64)], furnace: bool) {
        if !self.table || (furnace && !self.furnace) {
            return;
        }
        if needs.iter().all(|(item, count)| self.item(item) >= *count) {
            for &(item, count) in needs {
                self.add(item, -count);
            }
            self.add(achievement.trim_start_matches("make_"), 1);
            self.unlock(achievement);
        }
    }

    fn place(&mut self, achievement: &'static str, item: &'static str, cost: i64) -> bool {
        if self.item(item) < cost {
            return false;
        }
        self.add(item, -cost);
        self.unlock(achievement);
        true
    }

    fn decay(&mut self) {
        let mut starving = false;
        if self.steps % NEED_DECAY_EVERY == 0 {
            for need in ["food", "drink"] {
                let value = self.stat_mut(need);
                *value = (*value - 1).max(0);
                starving |= *value == 0;
            }
        }
        if self.steps % ENERGY_DECAY_EVERY == 0 {
            let energy = self.stat_mut("energy");
            *energy = (*energy - 1).max(0);
            starving |= *energy == 0;
        }
        if starving {
            *self.stat_mut("health") -= 1;
        }
    }
}

impl CrafterEngine for MockCrafter {
    fn reset(&mut self) -> Result<CrafterInfo> {
        self.restart();
        Ok(self.info())
    }

    fn step(&mut self, action: usize) -> Result<CrafterStep> {
        let unlocked_before: u32 = self.achievements.values().filter(|c| **c > 0).count() as u32;
        let health_before = self.stats.get("health").copied().unwrap_or(0);
        self.steps += 1;

        match action {
            0 => {}
            1 => self.position[0] = (self.position[0] - 1).max(0),
            2 => self.position[0] = (self.position[0] + 1).min(WORLD_SIZE - 1),
            3 => self.position[1] = (self.position[1] - 1).max(0),
            4 => self.position[1] = (self.position[1] + 1).min(WORLD_SIZE - 1),
            5 => self.interact(),
            6 => {
                *self.stat_mut("energy") = MAX_STAT;
                self.unlock("wake_up");
            }
            7 => {
                self.place("place_stone", "stone", 1);
            }
            8 => {
                if self.place("place_table", "wood", 2) {
                    self.table = true;
                }
            }
            9 => {
                if self.table && self.place("place_furnace", "stone", 4) {
                    self.furnace = true;
                }
            }
            10 => {
                self.place("place_plant", "sapling", 1);
            }
            11 => self.craft("make_wood_pickaxe", &[("wood", 1)], false),
            12 => self.craft("make_stone_pickaxe", &[("wood", 1), ("stone", 1)], false),
            13 => self.craft("make_iron_pickaxe", &[("wood", 1), ("coal", 1), ("iron", 1)], true),
            14 => self.craft("make_wood_sword", &[("wood", 1)], false),
            15 => self.craft("make_stone_sword", &[("wood", 1), ("stone", 1)], false),
            16 => self.craft("make_iron_sword", &[("wood", 1), ("coal", 1), ("iron", 1)], true),
            other => return Err(WsapError::Game(format!("Crafter has no action {}", other))),
        }
        self.decay();

        let unlocked_after: u32 = self.achievements.values().filter(|c| **c > 0).count() as u32;
        let health = self.stats.get("health").copied().unwrap_or(0);
        let reward = f64::from(unlocked_after - unlocked_before) + (health - health_before) as f64 * 0.1;

        Ok(CrafterStep {
            reward,
            done: health <= 0 || self.steps >= EPISODE_LENGTH,
            info: self.info(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_reports_full_state() {
        let mut world = MockCrafter::new();
        let info = world.reset().unwrap();
        let inventory = info.inventory.unwrap();
        assert_eq!(inventory["health"], 9);
        assert_eq!(inventory["wood"], 0);
        assert_eq!(info.achievements.unwrap().len(), 22);
        assert_eq!(info.player_pos, Some([32, 32]));
    }

    #[test]
    fn test_inventory_follows_engine_order() {
        let mut world = MockCrafter::new();
        let info = world.reset().unwrap();
        let keys: Vec<String> = info.inventory.unwrap().keys().take(8).cloned().collect();
        assert_eq!(
            keys,
            vec!["health", "food", "drink", "energy", "sapling", "wood", "stone", "coal"]
        );
    }

    #[test]
    fn test_wood_table_pickaxe() {
        let mut world = MockCrafter::new();
        world.reset().unwrap();

        // (32, 32) faces a tree
        let step = world.step(5).unwrap();
        assert_eq!(step.reward, 1.0);
        world.step(5).unwrap();
        world.step(5).unwrap();
        let step = world.step(8).unwrap();
        assert_eq!(step.info.achievements.as_ref().unwrap()["place_table"], 1);
        let step = world.step(11).unwrap();
        let inventory = step.info.inventory.unwrap();
        assert_eq!(inventory["wood_pickaxe"], 1);
        assert_eq!(inventory["wood"], 0);
    }

    #[test]
    fn test_crafting_needs_a_table() {
        let mut world = MockCrafter::new();
        world.reset().unwrap();
        world.step(5).unwrap();
        let step = world.step(11).unwrap();
        assert_eq!(step.info.inventory.unwrap()["wood_pickaxe"], 0);
        assert_eq!(step.reward, 0.0);
    }

    #[test]
    fn test_needs_decay_and_starvation_ends_episode() {
        let mut world = MockCrafter::new();
        world.reset().unwrap();
        let mut last = None;
        for _ in 0..2000 {
            let step = world.step(0).unwrap();
            let done = step.done;
            last = Some(step);
            if done {
                break;
            }
        }
        let last = last.unwrap();
        assert!(last.done);
        assert!(last.info.inventory.unwrap()["health"].as_i64().unwrap() <= 0);
    }

    #[test]
    fn test_out_of_range_action() {
        let mut world = MockCrafter::new();
        world.reset().unwrap();
        assert!(matches!(world.step(17), Err(WsapError::Game(_))));
    }
}
