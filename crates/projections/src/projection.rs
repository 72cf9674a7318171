//! Core projection trait and position tracking.

use async_trait::async_trait;
use event_store::RecordedEvent;

use crate::Result;

/// How far through the global event log a projection has read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    /// Global position of the last event handled, 0 before the first.
    pub last_position: i64,

    /// Number of events handled since the last reset.
    pub events_processed: u64,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Records that the event at `position` was handled. The position never
    /// moves backwards.
    #[must_use]
    pub fn advance_to(&self, position: i64) -> Self {
        Self {
            last_position: self.last_position.max(position),
            events_processed: self.events_processed + 1,
        }
    }

    /// Returns true if the event at `position` has not been handled yet.
    pub fn is_behind(&self, position: i64) -> bool {
        position > self.last_position
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "position({}, {} processed)",
            self.last_position, self.events_processed
        )
    }
}

/// A projection that folds recorded events into a read model.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Handles one event. Events arrive in global commit order.
    async fn handle(&self, event: &RecordedEvent) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Clears the read model and rewinds to the start of the log.
    async fn reset(&self) -> Result<()>;
}
