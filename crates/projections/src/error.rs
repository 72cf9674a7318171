//! Projection and repository error types.

use thiserror::Error;

/// Errors that can occur during projection processing or repository access.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// Failed to (de)serialize an event payload or a stored entity.
    #[error("Serialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The repository's database rejected or failed the operation.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A projection-specific error.
    #[error("Projection error: {0}")]
    Projection(String),
}

impl ProjectionError {
    /// Returns true if the failure came from the underlying storage.
    pub fn is_storage_failure(&self) -> bool {
        match self {
            ProjectionError::Database(_) => true,
            ProjectionError::EventStore(e) => e.is_storage_failure(),
            _ => false,
        }
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
