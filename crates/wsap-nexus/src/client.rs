//! HTTP client for agents and controllers talking to a running hub

use crate::game::GameInfo;
use crate::hub::{NexusObservation, TransitGrant};
use crate::identity::{AgentIdentity, Skills, StatsUpdate};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use wsap_core::{Result, WsapError};

/// Identity summary returned by `POST /transit/exit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitPackage {
    pub skills: Skills,
    /// Achievement names
    pub achievements: Vec<String>,
    pub total_steps: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitSummary {
    pub success: bool,
    pub transit_package: ExitPackage,
    #[serde(default)]
    pub nexus_observation: Option<NexusObservation>,
}

/// Client for the hub HTTP API
#[derive(Debug, Clone)]
pub struct NexusClient {
    client: Client,
    base_url: String,
}

impl NexusClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WsapError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn list_games(&self) -> Result<Vec<GameInfo>> {
        #[derive(Deserialize)]
        struct Games {
            games: Vec<GameInfo>,
        }
        let games: Games = self.get("/games").await?;
        Ok(games.games)
    }

    /// `None` when the hub does not know the game
    pub async fn get_game(&self, game_id: &str) -> Result<Option<GameInfo>> {
        self.get_optional(&format!("/games/{}", game_id)).await
    }

    pub async fn register_game(&self, info: &GameInfo) -> Result<()> {
        let _: serde_json::Value = self.post("/games", info).await?;
        Ok(())
    }

    /// Register or fetch an identity; never resets progress
    pub async fn register_agent(&self, agent_id: &str, name: &str) -> Result<AgentIdentity> {
        self.post("/agents", &json!({ "agent_id": agent_id, "name": name }))
            .await
    }

    pub async fn get_agent(&self, agent_id: &str) -> Result<Option<AgentIdentity>> {
        self.get_optional(&format!("/agents/{}", agent_id)).await
    }

    pub async fn get_nexus_observation(&self, agent_id: &str) -> Result<NexusObservation> {
        self.get(&format!("/nexus/{}", agent_id)).await
    }

    /// Prompt text for choosing the next game
    pub async fn observe(&self, agent_id: &str) -> Result<String> {
        Ok(self.get_nexus_observation(agent_id).await?.to_text())
    }

    /// Enter a game; a refusal comes back as `WsapError::Nexus` with the hub's reason
    pub async fn enter_game(&self, agent_id: &str, game_id: &str, goals: &[String]) -> Result<TransitGrant> {
        let body = json!({
            "agent_id": agent_id,
            "game_id": game_id,
            "preferences": { "spawn": "safe", "difficulty": "normal", "goals": goals },
        });
        self.post("/transit/enter", &body).await
    }

    /// Leave a game, folding `stats` into the identity first
    pub async fn exit_game(
        &self,
        agent_id: &str,
        game_id: &str,
        reason: &str,
        stats: Option<&StatsUpdate>,
    ) -> Result<ExitSummary> {
        let mut body = json!({ "agent_id": agent_id, "game_id": game_id, "reason": reason });
        if let Some(stats) = stats {
            body["stats"] = serde_json::to_value(stats)?;
        }
        self.post("/transit/exit", &body).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        decode(response).await
    }

    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

fn transport_error(err: reqwest::Error) -> WsapError {
    if err.is_timeout() {
        WsapError::Timeout(format!("Nexus request timed out: {}", err))
    } else {
        WsapError::Transport(format!("Nexus unreachable: {}", err))
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if !status.is_success() {
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| format!("HTTP {}", status));
        return Err(WsapError::Nexus(message));
    }
    serde_json::from_str(&body).map_err(Into::into)
}
