//! HTTP client for the bridge server
//!
//! Used by controllers (observe/act/reset) and by pollers (poll/result).

use crate::protocol::{
    ActRequest, BridgeStatus, Command, ObserveRequest, ResetRequest, ResultSubmission,
};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use wsap_core::{Params, Result, WsapError};

/// Client for a running bridge server
#[derive(Debug, Clone)]
pub struct BridgeClient {
    client: Client,
    base_url: String,
}

impl BridgeClient {
    /// `timeout` should exceed the server's command timeout so the server reports it first
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WsapError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the game for an observation
    pub async fn observe(&self, player_id: Option<&str>) -> Result<serde_json::Value> {
        let body = ObserveRequest {
            player_id: player_id.map(str::to_string),
        };
        self.post("/observe", &body).await
    }

    /// Ask the game to execute an action
    pub async fn act(
        &self,
        action: &str,
        parameters: Params,
        player_id: Option<&str>,
    ) -> Result<serde_json::Value> {
        let body = ActRequest {
            action: action.to_string(),
            parameters,
            player_id: player_id.map(str::to_string),
        };
        self.post("/act", &body).await
    }

    /// Ask the game to reset
    pub async fn reset(&self, player_id: Option<&str>) -> Result<serde_json::Value> {
        let body = ResetRequest {
            player_id: player_id.map(str::to_string),
        };
        self.post("/reset", &body).await
    }

    pub async fn status(&self) -> Result<BridgeStatus> {
        self.get("/status").await
    }

    /// Fetch the next command, `None` when the queue is idle
    pub async fn poll(&self) -> Result<Option<Command>> {
        let value: serde_json::Value = self.get("/poll").await?;
        if value.as_object().is_some_and(|o| o.is_empty()) {
            return Ok(None);
        }
        serde_json::from_value(value).map(Some).map_err(Into::into)
    }

    /// Answer a polled command; returns whether a submitter was still waiting
    pub async fn post_result(&self, id: &str, result: serde_json::Value) -> Result<bool> {
        let body = ResultSubmission {
            id: id.to_string(),
            result,
        };
        let reply: serde_json::Value = self.post("/result", &body).await?;
        Ok(reply
            .get("delivered")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
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
        WsapError::Timeout(format!("Bridge request timed out: {}", err))
    } else {
        WsapError::Transport(format!("Bridge unreachable: {}", err))
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(body);
        return Err(match status {
            StatusCode::GATEWAY_TIMEOUT => WsapError::Timeout(message),
            _ => WsapError::Transport(format!("Bridge returned {}: {}", status, message)),
        });
    }

    serde_json::from_str(&body).map_err(Into::into)
}
