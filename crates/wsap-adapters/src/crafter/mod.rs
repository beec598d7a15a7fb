//! Crafter adapter
//!
//! Crafter is a 2D survival game: collect, craft, survive. The engine itself is
//! reached only through [`CrafterEngine`].

pub mod engine;

pub use engine::{CrafterEngine, CrafterInfo, CrafterStep, MockCrafter};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use wsap_core::{
    Action, ActionDef, ActionResult, ActionSpace, Event, EventKind, Goal, Inventory, Location,
    Observation, Result, StatusMap, WsapError,
};
use wsap_runtime::GameAdapter;

const STATS: [&str; 4] = ["health", "food", "drink", "energy"];
const DAY_LENGTH: u64 = 300;
const EVENTS_SHOWN: usize = 5;

const DESCRIPTION: &str = "Crafter is a 2D procedural survival game inspired by Minecraft.

SURVIVAL NEEDS:
- Health: Take damage from enemies, lava, or starvation. Regenerates when other needs are met.
- Food: Decreases over time. Eat plants or cows to restore.
- Drink: Decreases over time. Use 'do' action facing water to drink.
- Energy: Decreases when awake. Sleep to restore.

CORE LOOP:
1. Collect wood from trees (use 'do' facing a tree)
2. Place a crafting table (needs 2 wood)
3. Make a wood pickaxe (needs 1 wood, near table)
4. Mine stone with pickaxe (use 'do' facing stone)
5. Make stone tools, place furnace, mine coal/iron
6. Make iron tools, mine diamonds

DANGERS:
- Zombies: Appear at night, chase you, deal melee damage
- Skeletons: Shoot arrows from distance
- Lava: Instant death
- Starvation: Low food/drink/energy causes health loss

TIPS:
- Collect saplings from grass and plant them for renewable wood
- Always keep drink above 2 (water is everywhere)
- Sleep before energy runs out
- Avoid zombies until you have a sword";

/// The Crafter action table; an action's index is its engine id
pub fn crafter_actions() -> Vec<ActionDef> {
    let def = |name: &str, description: &str, category: &str, requires: &[&str]| {
        requires
            .iter()
            .fold(ActionDef::new(name, description).category(category), |def, r| def.requires(*r))
    };
    vec![
        def("noop", "Do nothing, wait", "wait", &[]),
        def("move_left", "Move one tile left", "movement", &[]),
        def("move_right", "Move one tile right", "movement", &[]),
        def("move_up", "Move one tile up", "movement", &[]),
        def("move_down", "Move one tile down", "movement", &[]),
        def("do", "Interact with what's in front (collect, attack, drink)", "interact", &[]),
        def("sleep", "Sleep to restore energy", "survival", &["energy < max"]),
        def("place_stone", "Place stone block", "building", &["stone >= 1"]),
        def("place_table", "Place crafting table", "building", &["wood >= 2"]),
        def("place_furnace", "Place furnace", "building", &["stone >= 4"]),
        def("place_plant", "Plant a sapling", "building", &["sapling >= 1", "on grass"]),
        def("make_wood_pickaxe", "Craft wood pickaxe", "crafting", &["wood >= 1", "near table"]),
        def(
            "make_stone_pickaxe",
            "Craft stone pickaxe",
            "crafting",
            &["wood >= 1", "stone >= 1", "near table"],
        ),
        def(
            "make_iron_pickaxe",
            "Craft iron pickaxe",
            "crafting",
            &["wood >= 1", "coal >= 1", "iron >= 1", "near table+furnace"],
        ),
        def("make_wood_sword", "Craft wood sword", "crafting", &["wood >= 1", "near table"]),
        def(
            "make_stone_sword",
            "Craft stone sword",
            "crafting",
            &["wood >= 1", "stone >= 1", "near table"],
        ),
        def(
            "make_iron_sword",
            "Craft iron sword",
            "crafting",
            &["wood >= 1", "coal >= 1", "iron >= 1", "near table+furnace"],
        ),
    ]
}

/// Adapter over any [`CrafterEngine`]
pub struct CrafterAdapter<E: CrafterEngine> {
    engine: E,
    space: ActionSpace,
    info: Option<CrafterInfo>,
    step: u64,
    recent_events: Vec<Event>,
    unlocked: BTreeSet<String>,
    closed: bool,
}

impl<E: CrafterEngine> CrafterAdapter<E> {
    pub fn new(engine: E) -> Result<Self> {
        Ok(Self {
            engine,
            space: ActionSpace::new(crafter_actions())?,
            info: None,
            step: 0,
            recent_events: Vec::new(),
            unlocked: BTreeSet::new(),
            closed: false,
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed { Err(WsapError::Closed) } else { Ok(()) }
    }

    fn time_of_day(&self) -> &'static str {
        let cycle = (self.step % DAY_LENGTH) as f64 / DAY_LENGTH as f64;
        if cycle < 0.25 {
            "morning"
        } else if cycle < 0.5 {
            "day"
        } else if cycle < 0.75 {
            "evening"
        } else {
            "night (dangerous!)"
        }
    }

    fn build_observation(&self, info: &CrafterInfo) -> Result<Observation> {
        let inv = info
            .inventory
            .as_ref()
            .ok_or_else(|| WsapError::IncompleteState("Crafter info missing 'inventory'".into()))?;
        let missing: Vec<&str> = STATS.iter().copied().filter(|s| !inv.contains_key(*s)).collect();
        if !missing.is_empty() {
            return Err(WsapError::IncompleteState(format!(
                "Crafter inventory missing required stats: {}",
                missing.join(", ")
            )));
        }
        let pos = info
            .player_pos
            .ok_or_else(|| WsapError::IncompleteState("Crafter info missing 'player_pos'".into()))?;

        let mut status = StatusMap::new();
        for stat in STATS {
            status.insert(stat.to_string(), inv[stat].clone());
        }
        let inventory: Inventory = inv
            .iter()
            .filter(|(k, v)| !STATS.contains(&k.as_str()) && v.as_i64().is_some_and(|n| n > 0))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut location = Location::new(vec![pos[0] as f64, pos[1] as f64]);
        location.region = Some("surface".to_string());
        location.description = "Standing on the surface".to_string();

        let empty = BTreeMap::new();
        let achievements = info.achievements.as_ref().unwrap_or(&empty);

        let mut observation = Observation::new(status, inventory, location);
        observation.current_goals = current_goals(inv, achievements);
        let start = self.recent_events.len().saturating_sub(EVENTS_SHOWN);
        observation.recent_events = self.recent_events[start..].to_vec();
        observation.step = self.step;
        observation.time_of_day = Some(self.time_of_day().to_string());
        Ok(observation)
    }
}

fn current_goals(inv: &Inventory, achievements: &BTreeMap<String, u32>) -> Vec<Goal> {
    let mut goals = Vec::new();

    let stat = |name: &str| inv.get(name).and_then(Value::as_i64).unwrap_or(0);
    if stat("drink") <= 3 {
        goals.push(Goal::new("drink", "Find water and drink!", "urgent").with_progress(format!("drink: {}/9", stat("drink"))));
    }
    if stat("food") <= 3 {
        goals.push(
            Goal::new("food", "Find food (plants or cows)", "urgent").with_progress(format!("food: {}/9", stat("food"))),
        );
    }
    if stat("energy") <= 2 {
        goals.push(
            Goal::new("energy", "Sleep to restore energy", "urgent")
                .with_progress(format!("energy: {}/9", stat("energy"))),
        );
    }

    let progression = [
        ("collect_wood", "wood", "Collect wood from trees (use 'do' facing tree)"),
        ("place_table", "table", "Place a crafting table (needs 2 wood)"),
        ("make_wood_pickaxe", "pickaxe", "Make a wood pickaxe (need 1 wood, near table)"),
        ("collect_stone", "stone", "Mine stone with pickaxe"),
        ("make_stone_pickaxe", "better_pick", "Make a stone pickaxe"),
        ("collect_coal", "coal", "Mine coal for smelting"),
        ("place_furnace", "furnace", "Place a furnace (needs 4 stone)"),
        ("collect_iron", "iron", "Mine iron with stone pickaxe"),
        ("collect_diamond", "diamond", "Mine diamond with iron pickaxe"),
    ];
    let next = progression
        .iter()
        .find(|(achievement, _, _)| achievements.get(*achievement).copied().unwrap_or(0) == 0);
    goals.push(match next {
        Some((_, id, description)) => Goal::new(*id, *description, "main"),
        None => Goal::new("survive", "Survive and explore!", "main"),
    });
    goals
}

#[async_trait]
impl<E: CrafterEngine> GameAdapter for CrafterAdapter<E> {
    fn name(&self) -> &str {
        "Crafter"
    }

    fn game_description(&self) -> &str {
        DESCRIPTION
    }

    fn action_space(&self) -> ActionSpace {
        self.space.clone()
    }

    async fn observe(&mut self) -> Result<Observation> {
        self.ensure_open()?;
        let info = self
            .info
            .as_ref()
            .ok_or_else(|| WsapError::IncompleteState("Crafter has not been reset".into()))?;
        self.build_observation(info)
    }

    async fn act(&mut self, action: &Action) -> Result<ActionResult> {
        self.ensure_open()?;
        let Some(index) = self.space.actions().iter().position(|a| a.name == action.name) else {
            let observation = self.observe().await?;
            return Ok(ActionResult::failure(
                format!("Unknown action: {}", action.name),
                observation,
            ));
        };

        let health_before = self
            .info
            .as_ref()
            .and_then(|info| info.inventory.as_ref())
            .and_then(|inv| inv.get("health").and_then(Value::as_i64))
            .ok_or_else(|| WsapError::IncompleteState("Previous Crafter state missing health".into()))?;

        let step = self.engine.step(index)?;
        let earned = step
            .info
            .achievements
            .as_ref()
            .ok_or_else(|| WsapError::IncompleteState("Crafter info missing 'achievements'".into()))?;
        let health_after = step
            .info
            .inventory
            .as_ref()
            .and_then(|inv| inv.get("health").and_then(Value::as_i64))
            .ok_or_else(|| WsapError::IncompleteState("Crafter inventory missing health".into()))?;

        self.step += 1;
        self.recent_events.clear();

        let mut newly_unlocked = Vec::new();
        for (name, count) in earned {
            if *count > 0 && self.unlocked.insert(name.clone()) {
                newly_unlocked.push(name.clone());
                self.recent_events
                    .push(Event::new(format!("Achievement unlocked: {}", name), EventKind::Reward));
            }
        }
        if health_after < health_before {
            self.recent_events.push(Event::new(
                format!("Took damage! Health: {}", health_after),
                EventKind::Danger,
            ));
        }

        let message = if step.reward > 0.0 {
            format!("{}: gained reward!", action.name)
        } else if step.reward < 0.0 {
            format!("{}: took damage", action.name)
        } else {
            format!("{}: executed", action.name)
        };
        debug!(action = %action.name, reward = step.reward, done = step.done, "crafter step");

        let observation = self.build_observation(&step.info)?;
        self.info = Some(step.info);

        let mut result = ActionResult::success(message, observation);
        result.reward = step.reward;
        result.done = step.done;
        for name in newly_unlocked {
            result.add_achievement(name);
        }
        Ok(result)
    }

    async fn reset(&mut self) -> Result<Observation> {
        self.ensure_open()?;
        let info = self.engine.reset()?;
        self.step = 0;
        self.recent_events.clear();
        self.unlocked.clear();
        self.info = Some(info);
        self.observe().await
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed sequence of engine states
    struct Replay {
        reset: CrafterInfo,
        steps: Vec<CrafterStep>,
    }

    impl CrafterEngine for Replay {
        fn reset(&mut self) -> Result<CrafterInfo> {
            Ok(self.reset.clone())
        }

        fn step(&mut self, _action: usize) -> Result<CrafterStep> {
            if self.steps.is_empty() {
                return Err(WsapError::Game("replay exhausted".into()));
            }
            Ok(self.steps.remove(0))
        }
    }

    fn info(health: i64, food: i64, wood: i64, achievements: &[(&str, u32)]) -> CrafterInfo {
        let inventory = [("health", health), ("food", food), ("drink", 9), ("energy", 9), ("wood", wood), ("stone", 0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.into()))
            .collect();
        CrafterInfo {
            inventory: Some(inventory),
            achievements: Some(achievements.iter().map(|(k, v)| (k.to_string(), *v)).collect()),
            player_pos: Some([32, 32]),
        }
    }

    #[test]
    fn test_action_table() {
        let space = ActionSpace::new(crafter_actions()).unwrap();
        assert_eq!(space.actions().len(), 17);
        assert_eq!(space.actions()[5].name, "do");
        assert_eq!(space.actions()[16].name, "make_iron_sword");
    }

    #[tokio::test]
    async fn test_observation_splits_status_and_inventory() {
        let mut adapter = CrafterAdapter::new(Replay {
            reset: info(9, 9, 2, &[]),
            steps: vec![],
        })
        .unwrap();
        let obs = adapter.reset().await.unwrap();

        let keys: Vec<&str> = obs.status.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["health", "food", "drink", "energy"]);
        assert_eq!(obs.inventory.len(), 1);
        assert_eq!(obs.inventory["wood"], 2);
        assert_eq!(obs.location.coordinates, vec![32.0, 32.0]);
        assert_eq!(obs.time_of_day.as_deref(), Some("morning"));
        assert!(obs.to_text().contains("INVENTORY:\nwood: 2\n"));
        assert_eq!(obs.current_goals[0].id, "wood");
    }

    #[tokio::test]
    async fn test_inventory_text_keeps_engine_order() {
        let mut reset = info(9, 9, 3, &[]);
        if let Some(inventory) = reset.inventory.as_mut() {
            inventory.insert("stone".into(), 2.into());
            inventory.insert("coal".into(), 1.into());
        }
        let mut adapter = CrafterAdapter::new(Replay { reset, steps: vec![] }).unwrap();
        let obs = adapter.reset().await.unwrap();
        assert!(obs.to_text().contains("INVENTORY:\nwood: 3, stone: 2, coal: 1\n"));
    }

    #[tokio::test]
    async fn test_missing_state_is_an_error() {
        let mut adapter = CrafterAdapter::new(Replay {
            reset: CrafterInfo {
                player_pos: None,
                ..info(9, 9, 0, &[])
            },
            steps: vec![],
        })
        .unwrap();
        let err = adapter.reset().await.unwrap_err();
        assert!(matches!(err, WsapError::IncompleteState(ref m) if m.contains("player_pos")));

        let mut fresh = CrafterAdapter::new(MockCrafter::new()).unwrap();
        assert!(matches!(fresh.observe().await, Err(WsapError::IncompleteState(_))));
    }

    #[tokio::test]
    async fn test_unknown_action_is_a_failed_result() {
        let mut adapter = CrafterAdapter::new(MockCrafter::new()).unwrap();
        adapter.reset().await.unwrap();
        let result = adapter.act(&Action::new("fly")).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "Unknown action: fly");
        assert_eq!(result.observation.step, 0);
    }

    #[tokio::test]
    async fn test_damage_and_achievement_events() {
        let mut adapter = CrafterAdapter::new(Replay {
            reset: info(9, 2, 0, &[]),
            steps: vec![
                CrafterStep {
                    reward: 1.0,
                    done: false,
                    info: info(9, 2, 1, &[("collect_wood", 1)]),
                },
                CrafterStep {
                    reward: -0.1,
                    done: false,
                    info: info(7, 2, 1, &[("collect_wood", 2)]),
                },
            ],
        })
        .unwrap();
        let obs = adapter.reset().await.unwrap();
        assert_eq!(obs.current_goals[0].goal_type, "urgent");
        assert_eq!(obs.current_goals[0].progress.as_deref(), Some("food: 2/9"));

        let first = adapter.act(&Action::new("do")).await.unwrap();
        assert_eq!(first.achievements, vec!["collect_wood"]);
        assert_eq!(first.message, "do: gained reward!");
        assert_eq!(first.observation.recent_events[0].description, "Achievement unlocked: collect_wood");
        assert_eq!(first.observation.current_goals.last().unwrap().id, "table");

        let second = adapter.act(&Action::new("do")).await.unwrap();
        assert!(second.achievements.is_empty());
        assert_eq!(second.message, "do: took damage");
        assert_eq!(second.observation.recent_events.len(), 1);
        assert_eq!(second.observation.recent_events[0].kind, EventKind::Danger);
        assert_eq!(second.observation.recent_events[0].description, "Took damage! Health: 7");
    }

    #[tokio::test]
    async fn test_time_of_day_cycle() {
        let mut adapter = CrafterAdapter::new(MockCrafter::new()).unwrap();
        adapter.reset().await.unwrap();
        for _ in 0..230 {
            adapter.act(&Action::new("noop")).await.unwrap();
        }
        let obs = adapter.observe().await.unwrap();
        assert_eq!(obs.step, 230);
        assert_eq!(obs.time_of_day.as_deref(), Some("night (dangerous!)"));
    }

    #[tokio::test]
    async fn test_closed_adapter() {
        let mut adapter = CrafterAdapter::new(MockCrafter::new()).unwrap();
        adapter.reset().await.unwrap();
        adapter.close().await.unwrap();
        adapter.close().await.unwrap();
        assert!(matches!(adapter.observe().await, Err(WsapError::Closed)));
    }
}
