//! Facade factory
//!
//! Assembles the whole data core from configuration: default entity
//! catalog, storage connector, connection registry, model cache, facade.

use std::sync::Arc;

use mesa_core::connector::Connector;
use mesa_registry::ConnectionRegistry;

use crate::config::DataConfig;
use crate::facade::TenantDataFacade;
use mesa_core::Result;

/// Build a facade from configuration using the default storage backend.
///
/// With the `sqlite-store` feature enabled this wires the SQLite connector
/// (one database file per tenant, derived from the address template).
///
/// # Errors
/// - `Error::Config` if the configuration is invalid, or when no storage
///   backend feature is enabled
pub fn build_facade(config: &DataConfig) -> Result<TenantDataFacade> {
    config.validate()?;

    #[cfg(feature = "sqlite-store")]
    {
        let store_config = mesa_store_sqlite::SqliteStoreConfig::default()
            .with_address_template(&config.storage.address_template)
            .with_max_pool_connections(config.storage.max_pool_connections);
        let connector = Arc::new(mesa_store_sqlite::SqliteConnector::new(store_config));
        tracing::info!(
            template = %config.storage.address_template,
            "initializing sqlite-backed tenant data core"
        );
        build_facade_with_connector(connector, config)
    }

    #[cfg(not(feature = "sqlite-store"))]
    {
        Err(mesa_core::Error::Config(
            "no storage backend enabled; enable the 'sqlite-store' feature \
             or use build_facade_with_connector"
                .to_string(),
        ))
    }
}

/// Build a facade over an externally supplied connector (custom backends,
/// test doubles).
///
/// # Errors
/// - `Error::Config` if the registry configuration is invalid
pub fn build_facade_with_connector(
    connector: Arc<dyn Connector>,
    config: &DataConfig,
) -> Result<TenantDataFacade> {
    config.registry.validate()?;
    let catalog = Arc::new(mesa_catalog::default_catalog()?);
    let registry = ConnectionRegistry::new(connector, config.registry.clone());
    Ok(TenantDataFacade::new(catalog, registry))
}
