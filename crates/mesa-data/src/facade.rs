//! The tenant data facade
//!
//! The only entry point external collaborators use. HTTP controllers call
//! [`TenantDataFacade::resolve`] after the tenant-resolver middleware has
//! produced a `TenantKey`; webhook handlers and background sync jobs call it
//! the same way with a mapped tenant key. The facade delegates to the model
//! cache and translates nothing away: registry failures surface unchanged.

use std::sync::Arc;

use mesa_catalog::{entities, SchemaCatalog};
use mesa_core::tenant::TenantKey;
use mesa_core::Result;
use mesa_registry::{ConnectionRegistry, RegistrySnapshot};

use crate::cache::ModelCache;
use crate::handle::EntityHandle;

/// Public surface of the tenant data core.
///
/// Construction wires the model cache to the registry's eviction events and
/// starts the idle sweeper, so it must happen inside a tokio runtime.
/// [`shutdown`](Self::shutdown) closes every connection; call it on process
/// exit.
pub struct TenantDataFacade {
    registry: Arc<ConnectionRegistry>,
    cache: Arc<ModelCache>,
}

impl TenantDataFacade {
    /// Assemble the facade over a catalog and a connection registry
    pub fn new(catalog: Arc<SchemaCatalog>, registry: Arc<ConnectionRegistry>) -> Self {
        let cache = ModelCache::new(catalog, Arc::clone(&registry));
        cache.start_pruner();
        registry.start_sweeper();
        Self { registry, cache }
    }

    /// Resolve the handle for (tenant, entity).
    ///
    /// Repeated calls return the same handle until the tenant's connection
    /// is evicted, after which the handle is transparently rebuilt.
    ///
    /// # Errors
    /// - `Error::UnknownEntity` for an unregistered entity name
    /// - `Error::ConnectionTimeout` / `Error::ConnectionUnavailable` when
    ///   the tenant's storage cannot be reached; both are retryable
    pub async fn resolve(&self, tenant: &TenantKey, entity: &str) -> Result<Arc<EntityHandle>> {
        self.cache.get(tenant, entity).await
    }

    /// Orders handle for a tenant
    pub async fn orders(&self, tenant: &TenantKey) -> Result<Arc<EntityHandle>> {
        self.resolve(tenant, entities::ORDER).await
    }

    /// Menu items handle for a tenant
    pub async fn menu_items(&self, tenant: &TenantKey) -> Result<Arc<EntityHandle>> {
        self.resolve(tenant, entities::MENU_ITEM).await
    }

    /// Menus handle for a tenant
    pub async fn menus(&self, tenant: &TenantKey) -> Result<Arc<EntityHandle>> {
        self.resolve(tenant, entities::MENU).await
    }

    /// Tables handle for a tenant
    pub async fn tables(&self, tenant: &TenantKey) -> Result<Arc<EntityHandle>> {
        self.resolve(tenant, entities::TABLE).await
    }

    /// Customers handle for a tenant
    pub async fn customers(&self, tenant: &TenantKey) -> Result<Arc<EntityHandle>> {
        self.resolve(tenant, entities::CUSTOMER).await
    }

    /// Campaigns handle for a tenant
    pub async fn campaigns(&self, tenant: &TenantKey) -> Result<Arc<EntityHandle>> {
        self.resolve(tenant, entities::CAMPAIGN).await
    }

    /// Reviews handle for a tenant
    pub async fn reviews(&self, tenant: &TenantKey) -> Result<Arc<EntityHandle>> {
        self.resolve(tenant, entities::REVIEW).await
    }

    /// Loyalty settings handle for a tenant
    pub async fn loyalty_settings(&self, tenant: &TenantKey) -> Result<Arc<EntityHandle>> {
        self.resolve(tenant, entities::LOYALTY_SETTINGS).await
    }

    /// Staff handle for a tenant
    pub async fn staff(&self, tenant: &TenantKey) -> Result<Arc<EntityHandle>> {
        self.resolve(tenant, entities::STAFF).await
    }

    /// Variations handle for a tenant
    pub async fn variations(&self, tenant: &TenantKey) -> Result<Arc<EntityHandle>> {
        self.resolve(tenant, entities::VARIATION).await
    }

    /// Inventory handle for a tenant
    pub async fn inventory(&self, tenant: &TenantKey) -> Result<Arc<EntityHandle>> {
        self.resolve(tenant, entities::INVENTORY).await
    }

    /// Registry counters (establishments, reuse, evictions)
    pub fn stats(&self) -> RegistrySnapshot {
        self.registry.stats()
    }

    /// The underlying connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Close every connection and stop background tasks. Resolutions after
    /// shutdown fail with `ConnectionUnavailable`.
    pub async fn shutdown(&self) {
        self.cache.stop_pruner().await;
        self.registry.close_all().await;
        self.cache.purge_dead();
        tracing::info!("tenant data facade shut down");
    }
}

impl std::fmt::Debug for TenantDataFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantDataFacade")
            .field("cache", &self.cache)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryConnector;
    use mesa_core::Error;
    use mesa_registry::RegistryConfig;

    fn tenant(slug: &str) -> TenantKey {
        TenantKey::new(slug).unwrap()
    }

    fn facade(connector: Arc<MemoryConnector>) -> TenantDataFacade {
        let catalog = Arc::new(mesa_catalog::default_catalog().unwrap());
        let registry = ConnectionRegistry::new(connector, RegistryConfig::default());
        TenantDataFacade::new(catalog, registry)
    }

    #[tokio::test]
    async fn test_sugar_delegates_to_resolve() {
        let connector = MemoryConnector::new();
        let facade = facade(connector.clone());

        let via_sugar = facade.orders(&tenant("pizza-hut")).await.unwrap();
        let via_resolve = facade
            .resolve(&tenant("pizza-hut"), entities::ORDER)
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&via_sugar, &via_resolve));
        assert_eq!(connector.established(), 1);
    }

    #[tokio::test]
    async fn test_stats_observe_reuse() {
        let connector = MemoryConnector::new();
        let facade = facade(connector.clone());

        facade.customers(&tenant("pizza-hut")).await.unwrap();
        facade.campaigns(&tenant("pizza-hut")).await.unwrap();

        let stats = facade.stats();
        assert_eq!(stats.established, 1);
        assert_eq!(stats.reused, 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_connections() {
        let connector = MemoryConnector::new();
        let facade = facade(connector.clone());

        let handle = facade.orders(&tenant("pizza-hut")).await.unwrap();
        facade.shutdown().await;

        assert!(!handle.is_live());
        let err = facade.orders(&tenant("pizza-hut")).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionUnavailable(_)));
    }
}
