//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::game::Difficulty;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, comma-separated or `*`
    pub client_origin: String,

    pub difficulty: Difficulty,
    /// Seed for the server-owned random source handed to new entities
    pub world_seed: u64,
    /// Player actions accepted per session per second
    pub action_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT; fall back to SERVER_ADDR or default
        let server_addr = match var("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => var("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let difficulty = match var("DIFFICULTY") {
            Some(raw) => raw.parse().map_err(ConfigError::InvalidDifficulty)?,
            None => Difficulty::Normal,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: var("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
            difficulty,
            world_seed: parse_or(&var, "WORLD_SEED", 0)?,
            action_rate_limit: parse_or(&var, "ACTION_RATE_LIMIT", 60)?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid difficulty: {0}")]
    InvalidDifficulty(String),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 8080);
        assert_eq!(config.difficulty, Difficulty::Normal);
        assert_eq!(config.world_seed, 0);
        assert_eq!(config.action_rate_limit, 60);
        assert_eq!(config.client_origin, "*");
    }

    #[test]
    fn port_wins_over_server_addr() {
        let config = load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]).unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(matches!(
            load(&[("WORLD_SEED", "abc")]),
            Err(ConfigError::Invalid("WORLD_SEED"))
        ));
        assert!(matches!(
            load(&[("DIFFICULTY", "nightmare")]),
            Err(ConfigError::InvalidDifficulty(_))
        ));
    }
}
