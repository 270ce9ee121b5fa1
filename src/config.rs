//! Runtime configuration, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_PORT_ATTEMPTS: u32 = 10;

/// Relay configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Address to bind to
    pub host: String,
    /// Preferred port; later ports are tried if this one is taken
    pub port: u16,
    /// How many sequential ports to try, including `port`
    pub port_attempts: u32,
    /// Root directory for static assets
    pub public_dir: PathBuf,
    /// Document served for `/`
    pub index_file: String,
    /// Frames queued per observer before new ones are dropped for it
    pub observer_buffer: usize,
    /// SSE keep-alive comment interval (None = disabled)
    pub keep_alive: Option<Duration>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            port_attempts: DEFAULT_PORT_ATTEMPTS,
            public_dir: PathBuf::from("public"),
            index_file: "mod.html".to_string(),
            observer_buffer: 64,
            keep_alive: Some(Duration::from_secs(15)),
        }
    }
}

/// Read and parse an env var, ignoring it when unset or unparseable
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Read a non-empty env var
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl RelayConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = env_string("HOST").unwrap_or(defaults.host);

        let port = env_parse::<u16>("PORT")
            .filter(|p| *p != 0)
            .unwrap_or(defaults.port);

        let port_attempts = env_parse::<u32>("RELAY_PORT_ATTEMPTS")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.port_attempts);

        let public_dir = env_string("RELAY_PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.public_dir);

        let index_file = env_string("RELAY_INDEX_FILE").unwrap_or(defaults.index_file);

        let observer_buffer = env_parse::<usize>("RELAY_OBSERVER_BUFFER")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.observer_buffer);

        let keep_alive = match env_parse::<u64>("RELAY_KEEPALIVE_SECS") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.keep_alive,
        };

        let config = Self {
            host,
            port,
            port_attempts,
            public_dir,
            index_file,
            observer_buffer,
            keep_alive,
        };

        tracing::info!(
            host = %config.host,
            port = config.port,
            port_attempts = config.port_attempts,
            public_dir = %config.public_dir.display(),
            observer_buffer = config.observer_buffer,
            keep_alive = ?config.keep_alive,
            "Relay config loaded"
        );

        config
    }
}
