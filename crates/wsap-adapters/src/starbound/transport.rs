//! How the Starbound adapter reaches the game

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use wsap_bridge::BridgeClient;
use wsap_core::{Params, Result};

/// Raw JSON exchange with the in-game mod
#[async_trait]
pub trait StarboundTransport: Send {
    async fn observe(&mut self, player_id: Option<&str>) -> Result<Value>;

    async fn act(&mut self, action: &str, parameters: &Params, player_id: Option<&str>) -> Result<Value>;

    async fn reset(&mut self, player_id: Option<&str>) -> Result<Value>;
}

/// Talks to the mod through a bridge server
#[derive(Debug, Clone)]
pub struct BridgeTransport {
    client: BridgeClient,
}

impl BridgeTransport {
    pub fn new(bridge_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: BridgeClient::new(bridge_url, timeout)?,
        })
    }

    pub fn from_client(client: BridgeClient) -> Self {
        Self { client }
    }

    pub fn bridge_url(&self) -> &str {
        self.client.base_url()
    }
}

#[async_trait]
impl StarboundTransport for BridgeTransport {
    async fn observe(&mut self, player_id: Option<&str>) -> Result<Value> {
        self.client.observe(player_id).await
    }

    async fn act(&mut self, action: &str, parameters: &Params, player_id: Option<&str>) -> Result<Value> {
        self.client.act(action, parameters.clone(), player_id).await
    }

    async fn reset(&mut self, player_id: Option<&str>) -> Result<Value> {
        self.client.reset(player_id).await
    }
}

/// In-memory stand-in for a running game
#[derive(Debug, Clone)]
pub struct MockStarbound {
    health: i64,
    energy: i64,
    position: [i64; 2],
    inventory: serde_json::Map<String, Value>,
    world: String,
}

impl Default for MockStarbound {
    fn default() -> Self {
        let mut inventory = serde_json::Map::new();
        inventory.insert("matter_manipulator".into(), 1.into());
        Self {
            health: 100,
            energy: 100,
            position: [0, 0],
            inventory,
            world: "garden_planet".to_string(),
        }
    }
}

impl MockStarbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> [i64; 2] {
        self.position
    }
}

#[async_trait]
impl StarboundTransport for MockStarbound {
    async fn observe(&mut self, _player_id: Option<&str>) -> Result<Value> {
        Ok(json!({
            "health": self.health,
            "max_health": 100,
            "energy": self.energy,
            "max_energy": 100,
            "position": self.position,
            "world_name": self.world,
            "location_description": format!("On {} surface", self.world),
            "inventory": self.inventory,
            "nearby_entities": [
                {"type": "bird", "distance": 5, "direction": "right", "interactable": false}
            ],
            "nearby_terrain": [
                {"type": "grass", "direction": "below", "passable": true},
                {"type": "tree", "direction": "right", "passable": false}
            ],
            "effects": [],
            "quests": [
                {"id": "main1", "description": "Find the artifact", "type": "main", "progress": "0/1"}
            ],
            "time_of_day": "day"
        }))
    }

    async fn act(&mut self, action: &str, _parameters: &Params, _player_id: Option<&str>) -> Result<Value> {
        Ok(match action {
            "move_right" => {
                self.position[0] += 1;
                json!({"success": true, "message": "Moved right"})
            }
            "move_left" => {
                self.position[0] -= 1;
                json!({"success": true, "message": "Moved left"})
            }
            "jump" => json!({"success": true, "message": "Jumped"}),
            "interact" => json!({
                "success": true,
                "message": "Interacted with tree",
                "events": [{"description": "Gathered wood", "type": "success"}]
            }),
            other => json!({"success": true, "message": format!("Executed {}", other)}),
        })
    }

    async fn reset(&mut self, _player_id: Option<&str>) -> Result<Value> {
        self.health = 100;
        self.energy = 100;
        self.position = [0, 0];
        Ok(json!({"success": true}))
    }
}
