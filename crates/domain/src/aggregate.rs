//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::{StreamId, Version};
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Each aggregate defines its events as one tagged enum; the variant name
/// becomes the stored event type, so handlers get exhaustive matching
/// instead of probing an untyped map.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates in an event-sourced system.
///
/// In event sourcing, aggregates:
/// - Are rebuilt by replaying their stream
/// - Decide which events a command produces
/// - Apply events to update state (pure, deterministic)
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name. Together with the id it names the
    /// aggregate's stream.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's identifier, or None before its first event.
    fn id(&self) -> Option<&AggregateId>;

    /// Returns the version of the stream this state was rebuilt from.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Must be pure and must not fail: events are facts that already happened.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Returns the stream for the aggregate with `id`.
    fn stream_id(id: &AggregateId) -> StreamId {
        StreamId::new(id.clone(), Self::aggregate_type())
    }
}
