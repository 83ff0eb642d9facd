//! Mesa Tenant Data Core
//!
//! The public surface of the data-access core. External collaborators call
//! [`TenantDataFacade::resolve`] with a tenant key and an entity name and
//! get back a ready-to-use [`EntityHandle`] bound exclusively to that
//! tenant's storage. Connections and schema bindings are reused across
//! requests; the facade performs no caching logic itself, only delegation.

pub mod cache;
pub mod config;
pub mod facade;
pub mod factory;
pub mod handle;

#[cfg(test)]
mod testing;

pub use cache::ModelCache;
pub use config::{DataConfig, StorageConfig};
pub use facade::TenantDataFacade;
pub use factory::{build_facade, build_facade_with_connector};
pub use handle::EntityHandle;
