//! Mesa SQLite storage backend
//!
//! `Connector` implementation keeping one SQLite database file per tenant.
//! The file path comes from an address template (`${tenant}` is replaced
//! with the tenant key), so isolation is structural: no query can cross
//! database files. Documents live in one JSON table per entity; filters
//! compile to `json_extract` predicates.

pub mod sqlite_connector;

pub use sqlite_connector::{SqliteConnector, SqliteStoreConfig};
