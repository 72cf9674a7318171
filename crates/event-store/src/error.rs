use thiserror::Error;

use crate::{StreamId, Version};

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The expected version did not match the stream's version at commit
    /// time. Nothing was appended.
    #[error(
        "Concurrency conflict on stream {stream}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        stream: StreamId,
        expected: Version,
        actual: Version,
    },

    /// The batch violated the append preconditions (empty, or events for a
    /// different stream). Nothing was appended.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage medium is unavailable.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl EventStoreError {
    /// Returns true for a version mismatch the caller may resolve by
    /// re-reading and retrying.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }

    /// Returns true when the underlying medium failed.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            EventStoreError::Database(_)
                | EventStoreError::Migration(_)
                | EventStoreError::Unavailable(_)
        )
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_classified_and_reports_versions() {
        let err = EventStoreError::ConcurrencyConflict {
            stream: StreamId::new("order-1", "Order"),
            expected: Version::new(0),
            actual: Version::new(1),
        };

        assert!(err.is_concurrency_conflict());
        assert!(!err.is_storage_failure());
        assert_eq!(
            err.to_string(),
            "Concurrency conflict on stream Order/order-1: expected version 0, found 1"
        );
    }

    #[test]
    fn unavailable_is_a_storage_failure() {
        let err = EventStoreError::Unavailable("disk offline".to_string());
        assert!(err.is_storage_failure());
        assert!(!err.is_concurrency_conflict());
    }
}
