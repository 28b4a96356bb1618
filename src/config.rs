//! Server Configuration
//!
//! Loaded from environment variables at startup.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3001;

/// Default leaderboard size.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 50;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required variable is not set.
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    /// Variable is set but could not be parsed.
    #[error("invalid value for {name}: {value}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Idle connections are dropped after this long.
    pub idle_timeout: Duration,
    /// Hex private key of the attestation signer.
    pub signer_key: String,
    /// Snapshot file (in-memory only if unset).
    pub data_path: Option<PathBuf>,
    /// Default and maximum leaderboard rows.
    pub leaderboard_limit: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            signer_key: String::new(),
            data_path: None,
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    ///
    /// `PRIVATE_KEY` is required. `PORT`, `BIND_HOST`, `MAX_CONNECTIONS`,
    /// `LEADERBOARD_LIMIT` and `DATA_PATH` are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let defaults = Self::default();

        let host: IpAddr = parse_or(&lookup, "BIND_HOST", defaults.bind_addr.ip())?;
        let port: u16 = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let max_connections = parse_or(&lookup, "MAX_CONNECTIONS", defaults.max_connections)?;
        let leaderboard_limit =
            parse_or(&lookup, "LEADERBOARD_LIMIT", defaults.leaderboard_limit)?;

        let signer_key = lookup("PRIVATE_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::Missing("PRIVATE_KEY"))?;

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            max_connections,
            signer_key,
            data_path: lookup("DATA_PATH").map(PathBuf::from),
            leaderboard_limit,
            ..defaults
        })
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("max_connections", &self.max_connections)
            .field("idle_timeout", &self.idle_timeout)
            .field("signer_key", &"<redacted>")
            .field("data_path", &self.data_path)
            .field("leaderboard_limit", &self.leaderboard_limit)
            .field("version", &self.version)
            .finish()
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
