//! Error types for the persistence layer.

use thiserror::Error;

/// Errors from the state store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The underlying database operation failed.
    #[error("database operation failed: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema migration failed.
    #[error("database migration failed: {0}")]
    Migration(String),

    /// A stored JSON blob could not be encoded or decoded.
    #[error("failed to encode or decode stored data: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The caller passed something the store cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
