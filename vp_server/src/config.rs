//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default bind address when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Default state file location
pub const DEFAULT_STATE_PATH: &str = "/tmp/vpoker.json";

/// Upper bound on bank chips per color; keeps a fresh table's item list sane
pub const MAX_CHIPS_PER_COLOR: usize = 500;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Where users and tables are saved
    pub state_path: PathBuf,
    /// How often the state file is rewritten
    pub save_interval: Duration,
    /// Bank chips of each color on a new table
    pub chips_per_color: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `state_path_override` - Optional state file override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        state_path_override: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => {
                let raw = std::env::var("SERVER_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
                raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("'{raw}' is not an IP:PORT address"),
                })?
            }
        };

        let state_path = state_path_override
            .or_else(|| std::env::var("STATE_PATH").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH));

        Ok(ServerConfig {
            bind,
            state_path,
            save_interval: Duration::from_secs(parse_env_or("SAVE_INTERVAL_SECS", 60)),
            chips_per_color: parse_env_or("CHIPS_PER_COLOR", vpoker::table::DEFAULT_CHIPS_PER_COLOR),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.save_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "SAVE_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.chips_per_color == 0 {
            return Err(ConfigError::Invalid {
                var: "CHIPS_PER_COLOR".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.chips_per_color > MAX_CHIPS_PER_COLOR {
            return Err(ConfigError::Invalid {
                var: "CHIPS_PER_COLOR".to_string(),
                reason: format!("Must be at most {MAX_CHIPS_PER_COLOR}"),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: DEFAULT_BIND.parse().unwrap(),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            save_interval: Duration::from_secs(60),
            chips_per_color: 50,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "CHIPS_PER_COLOR".to_string(),
            reason: "Must be greater than 0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("CHIPS_PER_COLOR"));
        assert!(msg.contains("greater than 0"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_interval() {
        let config = ServerConfig {
            save_interval: Duration::ZERO,
            ..config()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_config_validation_chip_count() {
        let none = ServerConfig {
            chips_per_color: 0,
            ..config()
        };
        assert!(none.validate().is_err());

        let too_many = ServerConfig {
            chips_per_color: MAX_CHIPS_PER_COLOR + 1,
            ..config()
        };
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn test_overrides_win() {
        let bind: SocketAddr = "0.0.0.0:9999".parse().unwrap();
        let config = ServerConfig::from_env(Some(bind), Some(PathBuf::from("/tmp/other.json"))).unwrap();
        assert_eq!(config.bind, bind);
        assert_eq!(config.state_path, PathBuf::from("/tmp/other.json"));
    }
}
