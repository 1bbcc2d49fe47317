//! Error types for reqsheet-store

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors returned by a [`RequestStore`](crate::RequestStore) or the notice helpers
///
/// A failed write never changes the stored document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No request with this ID
    #[error("Request not found: {0}")]
    NotFound(String),

    /// The write lost a race with another writer (e.g. the ID was taken or
    /// the document was deleted while waiting for its lock)
    #[error("Persistence conflict: {0}")]
    Conflict(String),

    /// The document is not acceptable
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The document could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// The e-mail collaborator failed
    #[error("Notice delivery failed: {0}")]
    Notice(String),

    /// Grid reconstruction failed
    #[error("Grid error: {0}")]
    Grid(#[from] reqsheet_core::Error),

    /// Database error
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
