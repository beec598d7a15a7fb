//! Text generation backends for LLM agents

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use wsap_core::{Result, WsapError};

/// Text in, text out
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for `prompt` under `system`
    async fn generate(&self, system: &str, prompt: &str) -> Result<String>;

    /// Model identifier for logs
    fn model(&self) -> &str {
        "unknown"
    }
}

/// Ollama connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    pub host: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "qwen3:8b".to_string(),
            temperature: 0.3,
            max_tokens: 500,
            timeout: Duration::from_secs(120),
        }
    }
}

impl OllamaConfig {
    /// Defaults overridden by `OLLAMA_HOST` and `WSAP_MODEL`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            if !host.trim().is_empty() {
                config.host = host.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(model) = std::env::var("WSAP_MODEL") {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }
        config
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    thinking: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Non-streaming client for Ollama's `/api/generate`
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WsapError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.config.host);
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions {
                num_predict: self.config.max_tokens,
                temperature: self.config.temperature,
            },
        };

        debug!(model = %self.config.model, prompt_length = prompt.len(), "sending generate request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            warn!(%status, error = %message, "generate request failed");
            return Err(WsapError::Backend(format!("Ollama returned {}: {}", status, message)));
        }

        let reply: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| WsapError::Backend(format!("Malformed Ollama response: {}", e)))?;
        let text = pick_text(reply)?;

        info!(model = %self.config.model, response_length = text.len(), "generate request complete");
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// Reasoning models sometimes leave `response` empty and put everything in `thinking`
fn pick_text(reply: GenerateResponse) -> Result<String> {
    if !reply.response.trim().is_empty() {
        return Ok(reply.response);
    }
    match reply.thinking {
        Some(thinking) if !thinking.trim().is_empty() => Ok(thinking),
        _ => Err(WsapError::Backend(
            "Ollama returned an empty response with no thinking".to_string(),
        )),
    }
}

fn transport_error(err: reqwest::Error) -> WsapError {
    if err.is_timeout() {
        WsapError::Timeout(format!("Ollama request timed out: {}", err))
    } else {
        WsapError::Transport(format!("Ollama unreachable: {}", err))
    }
}
