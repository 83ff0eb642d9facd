//! Data core configuration
//!
//! Read once at startup from a TOML or YAML file (or constructed in code).
//! Every field has a default so a minimal deployment needs no file at all.

use serde::{Deserialize, Serialize};
use std::path::Path;

use mesa_core::{Error, Result};
use mesa_registry::RegistryConfig;

/// Placeholder substituted with the tenant key in storage address templates
pub const TENANT_PLACEHOLDER: &str = "${tenant}";

/// Top-level configuration for the tenant data core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// Connection registry tuning
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Storage backend settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Storage backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage address template; `${tenant}` is replaced with the tenant key
    #[serde(default = "default_address_template")]
    pub address_template: String,

    /// Connection pool size per tenant database
    #[serde(default = "default_max_pool_connections")]
    pub max_pool_connections: u32,
}

fn default_address_template() -> String {
    format!("data/tenants/{}.db", TENANT_PLACEHOLDER)
}

fn default_max_pool_connections() -> u32 {
    5
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            address_template: default_address_template(),
            max_pool_connections: default_max_pool_connections(),
        }
    }
}

impl DataConfig {
    /// Load configuration from a TOML or YAML file, chosen by extension.
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be read
    /// - `Error::Config` on parse errors or an unsupported extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config: DataConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("invalid TOML in {:?}: {}", path, e)))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("invalid YAML in {:?}: {}", path, e)))?,
            _ => {
                return Err(Error::Config(format!(
                    "unsupported config extension for {:?} (expected .toml, .yaml or .yml)",
                    path
                )));
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that cannot work.
    ///
    /// # Errors
    /// - `Error::Config` if the registry settings are invalid or the
    ///   address template has no `${tenant}` placeholder
    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        if !self.storage.address_template.contains(TENANT_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "storage address_template must contain {}",
                TENANT_PLACEHOLDER
            )));
        }
        if self.storage.max_pool_connections == 0 {
            return Err(Error::Config(
                "max_pool_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
