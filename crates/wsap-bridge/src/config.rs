//! Bridge server configuration

use std::time::Duration;
use tracing::warn;

/// Bridge server configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Host to bind (default: 127.0.0.1)
    pub host: String,
    /// Port to bind (default: 9999)
    pub port: u16,
    /// How long a controller request waits for the game
    pub command_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9999,
            command_timeout: Duration::from_secs(30),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `WSAP_BRIDGE_HOST`, `WSAP_BRIDGE_PORT` and `WSAP_BRIDGE_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("WSAP_BRIDGE_HOST").unwrap_or(defaults.host),
            port: env_parse("WSAP_BRIDGE_PORT").unwrap_or(defaults.port),
            command_timeout: env_parse("WSAP_BRIDGE_TIMEOUT_SECS")
                .and_then(command_timeout)
                .unwrap_or(defaults.command_timeout),
        }
    }
}

/// Positive, finite seconds only; anything else keeps the default
fn command_timeout(secs: f64) -> Option<Duration> {
    match Duration::try_from_secs_f64(secs) {
        Ok(timeout) if !timeout.is_zero() => Some(timeout),
        _ => {
            warn!(secs, "Ignoring out-of-range bridge timeout");
            None
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9999);
        assert_eq!(config.command_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_command_timeout_rejects_out_of_range_seconds() {
        assert_eq!(command_timeout(2.5), Some(Duration::from_millis(2500)));
        for secs in [-1.0, 0.0, f64::NAN, f64::INFINITY, 1e30] {
            assert_eq!(command_timeout(secs), None, "{secs}");
        }
    }
}
