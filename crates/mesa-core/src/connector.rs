//! Storage connector traits
//!
//! The `Connector` trait is the seam between the data core and a concrete
//! storage backend. A connector establishes one `StorageConnection` per
//! tenant on demand; the connection registry owns the resulting connections
//! and decides when they are created, reused and released.
//!
//! Implementations:
//! - `SqliteConnector` (mesa-store-sqlite): one database file per tenant
//! - In-memory mock connectors in tests

use async_trait::async_trait;
use uuid::Uuid;

use crate::document::{Document, Filter};
use crate::schema::SchemaDefinition;
use crate::tenant::TenantKey;
use crate::Result;

/// Factory for per-tenant storage connections
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a live connection to one tenant's storage.
    ///
    /// Called by the connection registry on first demand per tenant; the
    /// registry guarantees at most one establishment attempt is in flight
    /// per tenant key and applies the configured timeout around this call.
    ///
    /// # Errors
    /// - `Error::ConnectionUnavailable` if the tenant's storage is unreachable
    async fn connect(&self, tenant: &TenantKey) -> Result<Box<dyn StorageConnection>>;
}

/// Live access to one tenant's data store.
///
/// All operations are scoped to the single tenant the connection was
/// established for; isolation is structural, not filtered.
#[async_trait]
pub trait StorageConnection: Send + Sync {
    /// Prepare storage for an entity (create tables, indexes). Idempotent;
    /// called once per (tenant, entity) binding.
    async fn prepare(&self, schema: &SchemaDefinition) -> Result<()>;

    /// Insert a document
    async fn insert(&self, entity: &str, doc: &Document) -> Result<()>;

    /// Find documents matching a filter
    async fn find(&self, entity: &str, filter: &Filter) -> Result<Vec<Document>>;

    /// Fetch a single document by id
    async fn get(&self, entity: &str, id: Uuid) -> Result<Option<Document>>;

    /// Replace a document by id. Returns false if no document matched.
    async fn update(&self, entity: &str, doc: &Document) -> Result<bool>;

    /// Delete a document by id. Returns false if no document matched.
    async fn delete(&self, entity: &str, id: Uuid) -> Result<bool>;

    /// Count documents matching a filter
    async fn count(&self, entity: &str, filter: &Filter) -> Result<u64>;

    /// Release backend resources. Idempotent.
    async fn close(&self) -> Result<()>;
}
