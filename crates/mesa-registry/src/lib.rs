//! Mesa Connection Registry
//!
//! Owns at most one live storage connection per tenant key. Connections are
//! established lazily with single-flight deduplication, reused across
//! requests, and released by idle eviction, capacity pressure or shutdown.
//! Eviction never touches a connection with in-flight operations.

pub mod config;
pub mod connection;
pub mod registry;
pub mod stats;

pub use config::RegistryConfig;
pub use connection::{ConnectionLease, TenantConnection};
pub use registry::{ConnectionRegistry, EvictionEvent, EvictionReason};
pub use stats::RegistrySnapshot;
