//! OpenStarbound adapter
//!
//! The game runs a Lua mod that can only make outbound HTTP calls, so every
//! request goes through a [`StarboundTransport`]; in production that is the
//! bridge server.

pub mod transport;

pub use transport::{BridgeTransport, MockStarbound, StarboundTransport};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use wsap_core::{
    Action, ActionDef, ActionResult, ActionSpace, Effect, Entity, Event, EventKind, Goal, Inventory,
    Location, Observation, ParamDef, Result, StatusMap, Terrain, WsapError,
};
use wsap_runtime::GameAdapter;

const REQUIRED_FIELDS: [&str; 5] = ["health", "max_health", "energy", "max_energy", "position"];
const EVENTS_SHOWN: usize = 5;

const DESCRIPTION: &str = "OpenStarbound is a 2D space exploration and survival game.

SETTING:
You are a space traveler with your own ship. You can beam down to procedurally
generated planets, explore caves, fight monsters, gather resources, and craft
items. Progress through missions to upgrade your ship and unlock new tech.

SURVIVAL:
- Health: Depletes from damage, environmental hazards. Heals over time or with food.
- Energy: Used for special abilities and tech. Regenerates over time.
- Hunger: Some modes require food consumption.
- Environment: Some planets have hazards (radiation, cold, heat, no air).

CORE LOOP:
1. Beam down to a planet
2. Explore surface and caves
3. Gather resources (ores, plants, monster drops)
4. Return to ship, craft better gear
5. Take on missions for story progression
6. Upgrade ship to travel further

CRAFTING:
- Basic crafting at Inventor's Table
- Smelting ores at Furnace
- Cooking at campfire/kitchen

COMBAT:
- Melee and ranged weapons
- Shields for blocking
- Techs for special abilities (dash, double-jump, etc.)

EXPLORATION:
- Each planet has unique biome, gravity, weather
- Underground caves with ore veins
- Dungeons and villages with NPCs";

/// The Starbound action table
pub fn starbound_actions() -> Vec<ActionDef> {
    let def = |name: &str, description: &str, category: &str| ActionDef::new(name, description).category(category);
    let param = |name: &str, description: &str| ParamDef::new(name, description);
    vec![
        def("move_left", "Move left", "movement"),
        def("move_right", "Move right", "movement"),
        def("jump", "Jump upward", "movement"),
        def("drop", "Drop down through platform", "movement"),
        def("warp", "Warp to location", "movement")
            .param(param("destination", "bookmarked location or coordinates"))
            .requires("Must have valid destination"),
        def("beam_up", "Beam up to ship", "movement").requires("On planet surface"),
        def("beam_down", "Beam down to planet", "movement").requires("In ship, planet selected"),
        def("interact", "Interact with nearby object/NPC", "interact"),
        def("use_tool", "Use currently equipped tool", "interact").requires("Tool equipped"),
        def("attack", "Attack with current weapon", "combat").requires("Weapon equipped"),
        def("alt_attack", "Alternate attack", "combat").requires("Weapon with alt-fire"),
        def("equip", "Equip item from inventory", "inventory").param(param("slot", "inventory slot number")),
        def("unequip", "Unequip current item", "inventory")
            .param(param("slot", "equipment slot: head/chest/legs/back")),
        def("consume", "Consume food/potion", "inventory")
            .param(param("item", "item name or slot"))
            .requires("Consumable in inventory"),
        def("drop_item", "Drop item on ground", "inventory").param(param("slot", "inventory slot")),
        def("craft", "Craft an item", "crafting")
            .param(param("item", "item to craft"))
            .requires("Near crafting station")
            .requires("Have materials"),
        def("open_crafting", "Open crafting interface", "crafting").requires("Near crafting station"),
        def("say", "Say something in chat", "social").param(param("message", "text to say")),
        def("emote", "Perform emote", "social").param(param("emote", "emote name")),
        def("check_quest", "Check current quest objectives", "quest"),
        def("track_quest", "Track a specific quest", "quest").param(param("quest_id", "quest to track")),
        def("use_tech", "Activate equipped tech", "tech")
            .param(param("slot", "tech slot: head/body/legs"))
            .requires("Tech equipped"),
        def("wait", "Wait/do nothing", "wait"),
        def("look", "Look around, update observations", "observe"),
    ]
}

#[derive(Debug, Deserialize)]
struct WireEntity {
    #[serde(rename = "type")]
    entity_type: String,
    distance: f64,
    #[serde(default = "nearby")]
    direction: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    interactable: bool,
}

fn nearby() -> String {
    "nearby".to_string()
}

#[derive(Debug, Deserialize)]
struct WireTerrain {
    #[serde(rename = "type")]
    terrain_type: String,
    #[serde(default = "here")]
    direction: String,
    #[serde(default = "passable")]
    passable: bool,
}

fn here() -> String {
    "here".to_string()
}

fn passable() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct WireQuest {
    id: String,
    description: String,
    #[serde(rename = "type", default = "quest")]
    quest_type: String,
    #[serde(default)]
    progress: Option<String>,
}

fn quest() -> String {
    "quest".to_string()
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default)]
    kind: EventKind,
}

#[derive(Debug, Default, Deserialize)]
struct WireState {
    #[serde(default)]
    inventory: serde_json::Map<String, Value>,
    #[serde(default)]
    world_name: Option<String>,
    #[serde(default)]
    location_description: String,
    #[serde(default)]
    nearby_entities: Vec<WireEntity>,
    #[serde(default)]
    nearby_terrain: Vec<WireTerrain>,
    #[serde(default)]
    effects: Vec<Effect>,
    #[serde(default)]
    quests: Vec<WireQuest>,
    #[serde(default)]
    time_of_day: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireActResult {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reward: f64,
    #[serde(default)]
    achievements: Vec<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    events: Vec<WireEvent>,
}

fn incomplete(context: &str, err: serde_json::Error) -> WsapError {
    WsapError::IncompleteState(format!("{}: {}", context, err))
}

/// Adapter over any [`StarboundTransport`]
pub struct StarboundAdapter<T: StarboundTransport> {
    transport: T,
    player_id: Option<String>,
    space: ActionSpace,
    step: u64,
    recent_events: Vec<Event>,
    closed: bool,
}

impl<T: StarboundTransport> StarboundAdapter<T> {
    pub fn new(transport: T) -> Result<Self> {
        Ok(Self {
            transport,
            player_id: None,
            space: ActionSpace::new(starbound_actions())?,
            step: 0,
            recent_events: Vec::new(),
            closed: false,
        })
    }

    /// Control a specific player in a multiplayer world
    pub fn with_player(mut self, player_id: impl Into<String>) -> Self {
        self.player_id = Some(player_id.into());
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed { Err(WsapError::Closed) } else { Ok(()) }
    }

    fn parse_observation(&self, data: Value) -> Result<Observation> {
        let Value::Object(map) = &data else {
            return Err(WsapError::IncompleteState("Bridge observe response is not an object".into()));
        };
        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|f| map.get(*f).is_none_or(Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(WsapError::IncompleteState(format!(
                "Bridge observe response missing required fields: {}",
                missing.join(", ")
            )));
        }

        let coordinates: Vec<f64> =
            serde_json::from_value(map["position"].clone()).map_err(|e| incomplete("Invalid position", e))?;
        let mut status = StatusMap::new();
        for field in &REQUIRED_FIELDS[..4] {
            status.insert(field.to_string(), map[*field].clone());
        }

        let wire: WireState = serde_json::from_value(data).map_err(|e| incomplete("Invalid observe response", e))?;

        let inventory: Inventory = wire.inventory.into_iter().filter(|(_, v)| v.is_number()).collect();

        let mut location = Location::new(coordinates);
        location.region = Some(wire.world_name.unwrap_or_else(|| "unknown".to_string()));
        location.description = wire.location_description;

        let mut observation = Observation::new(status, inventory, location);
        observation.nearby_entities = wire
            .nearby_entities
            .into_iter()
            .map(|e| Entity {
                entity_type: e.entity_type,
                distance: e.distance,
                direction: e.direction,
                name: e.name,
                state: e.state,
                interactable: e.interactable,
                description: None,
            })
            .collect();
        observation.nearby_terrain = wire
            .nearby_terrain
            .into_iter()
            .map(|t| Terrain {
                terrain_type: t.terrain_type,
                direction: t.direction,
                passable: t.passable,
            })
            .collect();
        observation.active_effects = wire.effects;
        observation.current_goals = wire
            .quests
            .into_iter()
            .map(|q| {
                let goal = Goal::new(q.id, q.description, q.quest_type);
                match q.progress {
                    Some(progress) => goal.with_progress(progress),
                    None => goal,
                }
            })
            .collect();
        let start = self.recent_events.len().saturating_sub(EVENTS_SHOWN);
        observation.recent_events = self.recent_events[start..].to_vec();
        observation.step = self.step;
        observation.time_of_day = wire.time_of_day;
        Ok(observation)
    }
}

#[async_trait]
impl<T: StarboundTransport> GameAdapter for StarboundAdapter<T> {
    fn name(&self) -> &str {
        "OpenStarbound"
    }

    fn game_description(&self) -> &str {
        DESCRIPTION
    }

    fn action_space(&self) -> ActionSpace {
        self.space.clone()
    }

    async fn observe(&mut self) -> Result<Observation> {
        self.ensure_open()?;
        let data = self.transport.observe(self.player_id.as_deref()).await?;
        self.parse_observation(data)
    }

    async fn act(&mut self, action: &Action) -> Result<ActionResult> {
        self.ensure_open()?;
        self.step += 1;
        self.recent_events.clear();

        if !self.space.contains(&action.name) {
            let observation = self.observe().await?;
            return Ok(ActionResult::failure(
                format!("Unknown action: {}", action.name),
                observation,
            ));
        }

        let reply = self
            .transport
            .act(&action.name, &action.parameters, self.player_id.as_deref())
            .await?;
        let reply: WireActResult =
            serde_json::from_value(reply).map_err(|e| incomplete("Invalid act response", e))?;
        debug!(action = %action.name, success = reply.success, reward = reply.reward, "starbound step");

        self.recent_events
            .extend(reply.events.into_iter().map(|e| Event::new(e.description, e.kind)));

        let observation = self.observe().await?;
        let message = reply.message.unwrap_or_else(|| action.name.clone());
        let mut result = if reply.success {
            ActionResult::success(message, observation)
        } else {
            ActionResult::failure(message, observation)
        };
        result.reward = reply.reward;
        result.done = reply.done;
        for name in reply.achievements {
            result.add_achievement(name);
        }
        Ok(result)
    }

    async fn reset(&mut self) -> Result<Observation> {
        self.ensure_open()?;
        self.step = 0;
        self.recent_events.clear();
        self.transport.reset(self.player_id.as_deref()).await?;
        self.observe().await
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
