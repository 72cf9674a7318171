//! Event store for the aggregate persistence core.
//!
//! Streams are keyed by `(aggregate id, aggregate type)`. Appends are atomic
//! per batch and guarded by an optional expected version, giving each stream
//! compare-and-swap semantics without holding locks across business logic.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, RecordedEvent, StreamId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream};
