//! Server configuration management.
//!
//! Consolidates environment variable reads and CLI overrides into one
//! validated structure.

use std::fmt;
use std::net::SocketAddr;

use liars_poker::room::RoomConfig;

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// WebSocket bind address.
    pub bind: SocketAddr,
    /// Prometheus scrape endpoint bind address.
    pub metrics_bind: SocketAddr,
    /// Path to the SQLite data file.
    pub data_path: String,
    /// Maximum seated players per room.
    pub max_players: usize,
    /// Maximum username length.
    pub max_username_len: usize,
    /// Deck/seat RNG seed override. Testing only.
    pub rng_seed: Option<u64>,
    /// Per-turn action timeout. Parsed and carried but not yet enforced.
    pub turn_timeout_secs: Option<u64>,
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid { var: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { var, reason } => {
                write!(f, "invalid value for {var}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn parse_env_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var,
            reason: format!("`{raw}` does not parse"),
        }),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from the environment, preferring CLI overrides.
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        data_path_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_or("LP_BIND", "127.0.0.1:8765".parse().expect("valid default"))?,
        };
        let metrics_bind = parse_env_or(
            "LP_METRICS_BIND",
            "127.0.0.1:9090".parse().expect("valid default"),
        )?;
        let data_path = data_path_override
            .or_else(|| std::env::var("LP_DATA_PATH").ok())
            .unwrap_or_else(|| "liars_poker.db".to_string());
        let max_players = parse_env_or("LP_MAX_PLAYERS", 8usize)?;
        let max_username_len = parse_env_or("LP_MAX_USERNAME_LEN", 20usize)?;
        let rng_seed = match std::env::var("LP_RNG_SEED") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "LP_RNG_SEED",
                reason: format!("`{raw}` is not a u64"),
            })?),
            Err(_) => None,
        };
        let turn_timeout_secs = match std::env::var("LP_TURN_TIMEOUT_SECS") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "LP_TURN_TIMEOUT_SECS",
                reason: format!("`{raw}` is not a u64"),
            })?),
            Err(_) => None,
        };

        Ok(Self {
            bind,
            metrics_bind,
            data_path,
            max_players,
            max_username_len,
            rng_seed,
            turn_timeout_secs,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_players < 2 || self.max_players > 8 {
            return Err(ConfigError::Invalid {
                var: "LP_MAX_PLAYERS",
                reason: "must be between 2 and 8".to_string(),
            });
        }
        if self.max_username_len < 2 || self.max_username_len > 64 {
            return Err(ConfigError::Invalid {
                var: "LP_MAX_USERNAME_LEN",
                reason: "must be between 2 and 64".to_string(),
            });
        }
        if self.rng_seed.is_some() {
            // Deterministic deals are fine on a test bench but fatal in
            // production; make sure nobody ships this by accident.
            tracing::warn!("LP_RNG_SEED is set: deals are predictable, testing only");
        }
        Ok(())
    }

    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            max_players: self.max_players,
            rng_seed: self.rng_seed,
            turn_timeout_secs: self.turn_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ServerConfig {
            bind: "127.0.0.1:8765".parse().unwrap(),
            metrics_bind: "127.0.0.1:9090".parse().unwrap(),
            data_path: "liars_poker.db".to_string(),
            max_players: 8,
            max_username_len: 20,
            rng_seed: None,
            turn_timeout_secs: None,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn max_players_bounds_are_enforced() {
        let mut config = ServerConfig {
            bind: "127.0.0.1:8765".parse().unwrap(),
            metrics_bind: "127.0.0.1:9090".parse().unwrap(),
            data_path: "liars_poker.db".to_string(),
            max_players: 1,
            max_username_len: 20,
            rng_seed: None,
            turn_timeout_secs: None,
        };
        assert!(config.validate().is_err());
        config.max_players = 9;
        assert!(config.validate().is_err());
    }
}
