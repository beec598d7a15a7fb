//! Polling bridge between controllers and a game mod
//!
//! Usage: `bridge-server [port]`. See `BridgeConfig::from_env` for the rest.

use anyhow::Result;
use wsap_bridge::{BridgeConfig, serve};
use wsap_cli::{init_tracing, port_arg};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let mut config = BridgeConfig::from_env();
    if let Some(port) = port_arg()? {
        config.port = port;
    }
    serve(config).await?;
    Ok(())
}
