//! Shared startup for the WSAP binaries

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Log to stderr, filtered by `RUST_LOG` (default `info`)
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// The single optional positional argument
pub fn positional_arg() -> Result<Option<String>> {
    let mut args = std::env::args().skip(1);
    let first = args.next();
    if let Some(extra) = args.next() {
        anyhow::bail!("Unexpected argument: {}", extra);
    }
    Ok(first)
}

/// Optional port override given as the positional argument
pub fn port_arg() -> Result<Option<u16>> {
    positional_arg()?
        .map(|raw| raw.parse().with_context(|| format!("Invalid port: {}", raw)))
        .transpose()
}
