//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use hanabi_live::{
    CoreConfig,
    config::{DEFAULT_CHAT_HISTORY_LENGTH, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_CHAT_LENGTH},
};
use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    str::FromStr,
    time::Duration,
};

pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8080));
pub const DEFAULT_IDLE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP/WebSocket bind address
    pub bind: SocketAddr,
    /// Prometheus scrape endpoint, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    pub chat_history_length: usize,
    pub max_chat_length: usize,
    /// Running games idle for this long are ended
    pub idle_timeout: Duration,
    /// How often the idle sweep is submitted to the Tables worker
    pub idle_sweep_interval: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `metrics_bind_override` - Optional metrics address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        metrics_bind_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env("SERVER_BIND")?.unwrap_or(DEFAULT_BIND_ADDR),
        };
        let metrics_bind = match metrics_bind_override {
            Some(bind) => Some(bind),
            None => parse_env("METRICS_BIND")?,
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            chat_history_length: parse_env("CHAT_HISTORY_LENGTH")?
                .unwrap_or(DEFAULT_CHAT_HISTORY_LENGTH),
            max_chat_length: parse_env("MAX_CHAT_LENGTH")?.unwrap_or(DEFAULT_MAX_CHAT_LENGTH),
            idle_timeout: parse_env("IDLE_TIMEOUT_SECS")?
                .map_or(DEFAULT_IDLE_TIMEOUT, Duration::from_secs),
            idle_sweep_interval: parse_env("IDLE_SWEEP_INTERVAL_SECS")?
                .map_or(DEFAULT_IDLE_SWEEP_INTERVAL, Duration::from_secs),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("CHAT_HISTORY_LENGTH", self.chat_history_length == 0),
            ("MAX_CHAT_LENGTH", self.max_chat_length == 0),
            ("IDLE_TIMEOUT_SECS", self.idle_timeout.is_zero()),
            ("IDLE_SWEEP_INTERVAL_SECS", self.idle_sweep_interval.is_zero()),
        ];
        for (var, is_zero) in positive {
            if is_zero {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server address ({})", self.bind),
            });
        }

        Ok(())
    }

    /// The library configuration handed to every domain worker
    pub fn core(&self) -> CoreConfig {
        CoreConfig {
            chat_history_length: self.chat_history_length,
            max_chat_length: self.max_chat_length,
            idle_timeout: self.idle_timeout,
            ..CoreConfig::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR,
            metrics_bind: None,
            chat_history_length: DEFAULT_CHAT_HISTORY_LENGTH,
            max_chat_length: DEFAULT_MAX_CHAT_LENGTH,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            idle_sweep_interval: DEFAULT_IDLE_SWEEP_INTERVAL,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Read and parse an environment variable; unset is `None`, garbage is an error
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => parse_value(key, &value).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::Invalid {
            var: key.to_string(),
            reason: "Not valid unicode".to_string(),
        }),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("{value:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "MAX_CHAT_LENGTH".to_string(),
            reason: "Must be greater than 0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("MAX_CHAT_LENGTH"));
        assert!(msg.contains("greater than 0"));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_config_validation_zero_sweep_interval() {
        let config = ServerConfig {
            idle_sweep_interval: Duration::ZERO,
            ..ServerConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref var, .. } if var == "IDLE_SWEEP_INTERVAL_SECS")
        );
    }

    #[test]
    fn test_config_validation_zero_chat_length() {
        let config = ServerConfig {
            max_chat_length: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_config_validation_metrics_on_server_port() {
        let config = ServerConfig {
            metrics_bind: Some(ServerConfig::default().bind),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_value_reports_the_variable() {
        let err = parse_value::<u64>("IDLE_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("IDLE_TIMEOUT_SECS"));
        assert_eq!(parse_value::<u64>("IDLE_TIMEOUT_SECS", " 90 ").unwrap(), 90);
    }

    #[test]
    fn test_core_config_carries_the_limits() {
        let config = ServerConfig {
            chat_history_length: 7,
            idle_timeout: Duration::from_secs(5),
            ..ServerConfig::default()
        };
        let core = config.core();
        assert_eq!(core.chat_history_length, 7);
        assert_eq!(core.idle_timeout, Duration::from_secs(5));
        assert_eq!(core.max_chat_length, DEFAULT_MAX_CHAT_LENGTH);
    }
}
