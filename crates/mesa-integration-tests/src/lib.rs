//! Integration tests for the Mesa tenant data core
//!
//! The tests live in `tests/` and exercise the full stack: facade, model
//! cache, connection registry and storage connectors (in-memory mock and
//! SQLite). See `tests/common.rs` for the shared test connector.
