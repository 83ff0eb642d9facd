//! Connection registry configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use mesa_core::{Error, Result};

/// Configuration for the connection registry, read once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum number of live connections across all tenants
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Idle duration after which a connection is evicted
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Bound on connection establishment
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Interval between idle-eviction sweeps
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

fn default_max_connections() -> usize {
    100
}

fn default_idle_timeout_ms() -> u64 {
    300_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_sweep_interval_ms() -> u64 {
    30_000
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            idle_timeout_ms: default_idle_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl RegistryConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Check the configuration for values that cannot work.
    ///
    /// # Errors
    /// - `Error::Config` if the connection cap or any duration is zero
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.idle_timeout_ms == 0 || self.connect_timeout_ms == 0 || self.sweep_interval_ms == 0
        {
            return Err(Error::Config(
                "registry timeouts and intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RegistryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_cap_rejected() {
        let config = RegistryConfig {
            max_connections: 0,
            ..RegistryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let config: RegistryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_connections, 100);
        assert_eq!(config.idle_timeout_ms, 300_000);
    }

    #[test]
    fn test_partial_override() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{ "max_connections": 8, "idle_timeout_ms": 100 }"#).unwrap();
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.idle_timeout_ms, 100);
        assert_eq!(config.connect_timeout_ms, 5_000);
    }
}
