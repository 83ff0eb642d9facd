//! Error types for Mesa Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Catalog errors
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    // Connection errors
    #[error("Tenant storage unavailable: {0}")]
    ConnectionUnavailable(String),

    #[error("Connection establishment for tenant '{tenant}' timed out after {timeout_ms}ms")]
    ConnectionTimeout { tenant: String, timeout_ms: u64 },

    // Tenant errors
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Invalid tenant key: {0}")]
    InvalidTenant(String),

    // Document errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure is transient and the caller may retry.
    ///
    /// Connection timeouts are treated identically to unreachable storage:
    /// both leave the registry clean, and a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ConnectionUnavailable(_) | Error::ConnectionTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
