//! Hub server configuration

use std::time::Duration;
use tracing::warn;

/// Nexus server configuration
#[derive(Debug, Clone)]
pub struct NexusConfig {
    /// Host to bind (default: 127.0.0.1)
    pub host: String,
    /// Port to bind (default: 9998)
    pub port: u16,
    /// Idle sessions older than this are transited out; `None` keeps them forever
    pub session_ttl: Option<Duration>,
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9998,
            session_ttl: None,
        }
    }
}

impl NexusConfig {
    /// Defaults overridden by `WSAP_NEXUS_HOST`, `WSAP_NEXUS_PORT` and `WSAP_SESSION_TTL_SECS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("WSAP_NEXUS_HOST").unwrap_or(defaults.host),
            port: env_parse("WSAP_NEXUS_PORT").unwrap_or(defaults.port),
            session_ttl: env_parse::<u64>("WSAP_SESSION_TTL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .or(defaults.session_ttl),
        }
    }

    /// How often the expiry sweep runs for a given TTL
    pub fn sweep_interval(ttl: Duration) -> Duration {
        (ttl / 2).max(Duration::from_secs(1))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}
