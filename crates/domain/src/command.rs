//! Command handling infrastructure.

use std::collections::HashMap;
use std::marker::PhantomData;

use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, RecordedEvent, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;
use crate::message::{CommandId, CommandMetadata};

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The stream version after the command.
    pub new_version: Version,
}

/// Trait for commands that can be executed against an aggregate.
///
/// Commands represent an intention to perform an action. They may be rejected
/// if the aggregate's current state doesn't allow the action.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> &AggregateId;

    /// Returns the command's identity and issue time.
    fn metadata(&self) -> &CommandMetadata;

    fn command_id(&self) -> CommandId {
        self.metadata().command_id
    }
}

/// Handler for executing commands against aggregates.
///
/// The handler:
/// 1. Rebuilds the aggregate from its stream
/// 2. Runs the command to produce events
/// 3. Appends them, expecting the version it loaded
///
/// A concurrent writer between steps 1 and 3 makes the append fail with a
/// concurrency conflict. The handler reports it and does not retry.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate from the event store.
    ///
    /// If the aggregate doesn't exist, returns a default instance.
    pub async fn load(&self, aggregate_id: &AggregateId) -> Result<A, DomainError> {
        let events = self
            .store
            .load_events(&A::stream_id(aggregate_id), None)
            .await?;

        let mut aggregate = A::default();
        for recorded in events {
            let event: A::Event = serde_json::from_value(recorded.event.payload)?;
            aggregate.apply(event);
            aggregate.set_version(recorded.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load_existing(&self, aggregate_id: &AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        if aggregate.id().is_some() {
            Ok(Some(aggregate))
        } else {
            Ok(None)
        }
    }

    /// Returns the recorded history of an aggregate.
    pub async fn history(&self, aggregate_id: &AggregateId) -> Result<Vec<RecordedEvent>, DomainError> {
        Ok(self
            .store
            .load_events(&A::stream_id(aggregate_id), None)
            .await?)
    }

    /// Executes a command function and persists the resulting events.
    ///
    /// The command function receives the current aggregate state and returns
    /// either a list of events to apply, or an error.
    pub async fn execute<F>(
        &self,
        aggregate_id: &AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        self.execute_with_metadata(aggregate_id, HashMap::new(), command_fn)
            .await
    }

    /// Executes a typed command, tagging every produced event with the
    /// command's id and issue time.
    pub async fn execute_command<C, F>(
        &self,
        command: &C,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        C: Command<Aggregate = A>,
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        self.execute_with_metadata(
            command.aggregate_id(),
            command.metadata().to_event_metadata(),
            command_fn,
        )
        .await
    }

    async fn execute_with_metadata<F>(
        &self,
        aggregate_id: &AggregateId,
        metadata: HashMap<String, serde_json::Value>,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(aggregate_id).await?;
        let current_version = aggregate.version();

        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        let envelopes = self.build_envelopes(aggregate_id, &events, &metadata)?;

        let new_version = self
            .store
            .save_events(
                &A::stream_id(aggregate_id),
                envelopes,
                AppendOptions::expect_version(current_version),
            )
            .await?;

        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    /// Builds event envelopes from domain events.
    fn build_envelopes(
        &self,
        aggregate_id: &AggregateId,
        events: &[A::Event],
        metadata: &HashMap<String, serde_json::Value>,
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let stream = A::stream_id(aggregate_id);
        let mut envelopes = Vec::with_capacity(events.len());

        for event in events {
            let mut envelope =
                EventEnvelope::new(&stream, event.event_type(), serde_json::to_value(event)?);
            envelope.metadata = metadata.clone();
            envelopes.push(envelope);
        }

        Ok(envelopes)
    }
}
