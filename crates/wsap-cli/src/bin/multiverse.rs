//! Multiverse runner: one LLM agent travelling between games via the Nexus
//!
//! Usage: `multiverse [mock]`. With `mock`, Starbound is simulated in memory
//! instead of going through the bridge server.
//!
//! Environment:
//! - `WSAP_NEXUS_URL` (default `http://127.0.0.1:9998`)
//! - `WSAP_BRIDGE_URL` (default `http://127.0.0.1:9999`)
//! - `WSAP_AGENT_ID`, `WSAP_AGENT_NAME`
//! - `WSAP_MAX_STEPS`, `WSAP_MAX_GAMES`
//! - `OLLAMA_HOST`, `WSAP_MODEL`

use anyhow::{Result, bail};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use wsap_adapters::{BridgeTransport, CrafterAdapter, MockCrafter, MockStarbound, StarboundAdapter};
use wsap_cli::{init_tracing, positional_arg};
use wsap_nexus::NexusClient;
use wsap_runtime::{
    AdapterFactory, ControllerOptions, GameAdapter, GenerationBackend, MemoryAgent, MultiverseController,
    OllamaBackend,
};

const DEFAULT_NEXUS_URL: &str = "http://127.0.0.1:9998";
const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:9999";

// Longer than the bridge's own command timeout so the bridge reports it first
const BRIDGE_CLIENT_TIMEOUT: Duration = Duration::from_secs(35);

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid {}: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

fn crafter_factory() -> AdapterFactory {
    Box::new(|| -> wsap_core::Result<Box<dyn GameAdapter>> {
        let adapter: Box<dyn GameAdapter> = Box::new(CrafterAdapter::new(MockCrafter::new())?);
        Ok(adapter)
    })
}

fn starbound_factory(mock: bool, bridge_url: String) -> AdapterFactory {
    Box::new(move || -> wsap_core::Result<Box<dyn GameAdapter>> {
        let adapter: Box<dyn GameAdapter> = if mock {
            Box::new(StarboundAdapter::new(MockStarbound::new())?)
        } else {
            Box::new(StarboundAdapter::new(BridgeTransport::new(&bridge_url, BRIDGE_CLIENT_TIMEOUT)?)?)
        };
        Ok(adapter)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let mock = match positional_arg()?.as_deref() {
        None => false,
        Some("mock") => true,
        Some(other) => bail!("Unknown mode: {} (expected `mock`)", other),
    };

    let nexus_url = env_or("WSAP_NEXUS_URL", DEFAULT_NEXUS_URL);
    let bridge_url = env_or("WSAP_BRIDGE_URL", DEFAULT_BRIDGE_URL);
    let defaults = ControllerOptions::default();
    let options = ControllerOptions {
        max_total_steps: env_number("WSAP_MAX_STEPS", defaults.max_total_steps)?,
        max_games: env_number("WSAP_MAX_GAMES", defaults.max_games)?,
    };

    let backend = Arc::new(OllamaBackend::from_env()?);
    let starbound = if mock { "mock" } else { bridge_url.as_str() };
    info!(model = backend.model(), %nexus_url, starbound, "Multiverse runner starting");

    let agent = MemoryAgent::new(backend.clone());
    let mut controller = MultiverseController::new(
        NexusClient::new(&nexus_url)?,
        env_or("WSAP_AGENT_ID", "agent-001"),
        env_or("WSAP_AGENT_NAME", "Explorer"),
        backend,
        Box::new(agent),
    )
    .with_options(options)
    .with_adapter("crafter", crafter_factory())
    .with_adapter("starbound", starbound_factory(mock, bridge_url));

    let report = controller.run().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
