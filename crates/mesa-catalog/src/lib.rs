//! Mesa Schema Catalog
//!
//! The static registry mapping logical entity names to their schema
//! definitions. Built once at startup, read-only afterwards, shared across
//! all tenants. `entities` carries the built-in restaurant entity set.

pub mod catalog;
pub mod entities;

pub use catalog::{SchemaCatalog, SchemaCatalogBuilder};
pub use entities::default_catalog;
