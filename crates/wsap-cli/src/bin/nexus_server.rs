//! Nexus hub server
//!
//! Usage: `nexus-server [port]`. Host and session TTL come from the
//! environment (`WSAP_NEXUS_HOST`, `WSAP_NEXUS_PORT`, `WSAP_SESSION_TTL_SECS`).

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use wsap_cli::{init_tracing, port_arg};
use wsap_nexus::{Nexus, NexusConfig, seed_games, serve};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let mut config = NexusConfig::from_env();
    if let Some(port) = port_arg()? {
        config.port = port;
    }

    let nexus = Arc::new(Nexus::default());
    for game in seed_games() {
        info!(game_id = %game.id, status = ?game.status, "Seeding game");
        nexus.register_game(game).await;
    }

    serve(config, nexus).await?;
    Ok(())
}
