//! Wire schemas for the bridge HTTP API
//!
//! The in-game poller sees commands as flat JSON objects:
//! `{"id": "...", "type": "act", "action": "jump", "parameters": {}, "player_id": null}`

use serde::{Deserialize, Serialize};

/// Server-generated command identifier
pub type CommandId = String;

/// What the controller is asking the game to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Observe,
    Act,
    Reset,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Observe => "observe",
            CommandType::Act => "act",
            CommandType::Reset => "reset",
        }
    }
}

/// A queued command as handed to the poller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    /// Type-specific fields, flattened next to `id` and `type`
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// `POST /result` body sent by the poller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSubmission {
    pub id: CommandId,
    #[serde(default = "empty_object")]
    pub result: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// `POST /observe` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObserveRequest {
    #[serde(default)]
    pub player_id: Option<String>,
}

/// `POST /act` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActRequest {
    pub action: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub player_id: Option<String>,
}

/// `POST /reset` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub player_id: Option<String>,
}

impl ObserveRequest {
    pub fn into_payload(self) -> serde_json::Map<String, serde_json::Value> {
        let mut payload = serde_json::Map::new();
        payload.insert("player_id".into(), self.player_id.into());
        payload
    }
}

impl ActRequest {
    pub fn into_payload(self) -> serde_json::Map<String, serde_json::Value> {
        let mut payload = serde_json::Map::new();
        payload.insert("action".into(), self.action.into());
        payload.insert("parameters".into(), serde_json::Value::Object(self.parameters));
        payload.insert("player_id".into(), self.player_id.into());
        payload
    }
}

impl ResetRequest {
    pub fn into_payload(self) -> serde_json::Map<String, serde_json::Value> {
        let mut payload = serde_json::Map::new();
        payload.insert("player_id".into(), self.player_id.into());
        payload
    }
}

/// `GET /status` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub status: String,
    /// True when the game polled recently
    pub connected: bool,
    /// Commands waiting to be polled
    pub pending: usize,
    /// Submitters still waiting for a result
    pub in_flight: usize,
    pub submitted: u64,
    pub delivered: u64,
    pub timed_out: u64,
    /// Results that arrived for ids nobody was waiting on
    pub discarded_results: u64,
}
