use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{EventEnvelope, EventStoreError, RecordedEvent, Result, StreamId, Version};

/// Options for appending events to the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendOptions {
    /// Expected version of the stream for optimistic concurrency control.
    /// If None, no version check is performed; the batch is still atomic.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the stream to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the stream to be empty.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// A stream of recorded events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<RecordedEvent>> + Send>>;

/// Core trait for event store implementations.
///
/// Implementations must make the version check and the append of
/// [`EventStore::save_events`] a single atomic step per stream, must never
/// expose a partially appended batch to readers, and must not retry on the
/// caller's behalf.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of events to a stream.
    ///
    /// The batch is committed in order as one unit, or not at all. When
    /// `options.expected_version` is set and differs from the stream's
    /// current version the call fails with
    /// [`EventStoreError::ConcurrencyConflict`].
    ///
    /// Returns the stream version after the append.
    async fn save_events(
        &self,
        stream: &StreamId,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
    ) -> Result<Version>;

    /// Loads a stream's events in commit order.
    ///
    /// With `from_version`, events recorded at or before that version are
    /// skipped. An unknown stream yields an empty vector.
    async fn load_events(
        &self,
        stream: &StreamId,
        from_version: Option<Version>,
    ) -> Result<Vec<RecordedEvent>>;

    /// Returns the current version of a stream (0 if it has no events).
    async fn stream_version(&self, stream: &StreamId) -> Result<Version>;

    /// Streams every event in the store in global commit order.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Checks that the storage medium is reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends a single event to a stream.
    async fn save_event(
        &self,
        stream: &StreamId,
        event: EventEnvelope,
        options: AppendOptions,
    ) -> Result<Version> {
        self.save_events(stream, vec![event], options).await
    }

    /// Checks if a stream has any events.
    async fn stream_exists(&self, stream: &StreamId) -> Result<bool> {
        Ok(self.stream_version(stream).await? > Version::initial())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for std::sync::Arc<T> {
    async fn save_events(
        &self,
        stream: &StreamId,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
    ) -> Result<Version> {
        (**self).save_events(stream, events, options).await
    }

    async fn load_events(
        &self,
        stream: &StreamId,
        from_version: Option<Version>,
    ) -> Result<Vec<RecordedEvent>> {
        (**self).load_events(stream, from_version).await
    }

    async fn stream_version(&self, stream: &StreamId) -> Result<Version> {
        (**self).stream_version(stream).await
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        (**self).stream_all_events().await
    }

    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }
}

/// Validates a batch before appending it to `stream`.
pub fn validate_events_for_append(stream: &StreamId, events: &[EventEnvelope]) -> Result<()> {
    if events.is_empty() {
        return Err(EventStoreError::InvalidAppend(
            "Cannot append empty event list".to_string(),
        ));
    }

    if let Some(stray) = events.iter().find(|e| !stream.owns(e)) {
        return Err(EventStoreError::InvalidAppend(format!(
            "Event {} belongs to {}/{}, not {}",
            stray.event_id, stray.aggregate_type, stray.aggregate_id, stream
        )));
    }

    Ok(())
}

/// Rejects the append when an expected version was supplied and the stream
/// has moved on.
pub fn check_expected_version(
    stream: &StreamId,
    options: AppendOptions,
    actual: Version,
) -> Result<()> {
    match options.expected_version {
        Some(expected) if expected != actual => Err(EventStoreError::ConcurrencyConflict {
            stream: stream.clone(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}
