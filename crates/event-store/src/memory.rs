use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EventEnvelope, EventStoreError, RecordedEvent, Result, StreamId, Version,
    store::{
        AppendOptions, EventStore, EventStream, check_expected_version,
        validate_events_for_append,
    },
};

type StreamCell = Arc<RwLock<Vec<RecordedEvent>>>;

/// In-memory event store.
///
/// Each stream sits behind its own lock, so writers on different streams do
/// not contend. A writer holds its stream's lock from the version check until
/// the batch is visible in both the stream and the global log; readers take a
/// single read lock and therefore see a batch entirely or not at all.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<StreamId, StreamCell>>>,
    log: Arc<RwLock<Vec<RecordedEvent>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.log.read().await.len()
    }

    /// Returns the number of streams that have been written to.
    pub async fn stream_count(&self) -> usize {
        let streams = self.streams.read().await;
        let mut count = 0;
        for cell in streams.values() {
            if !cell.read().await.is_empty() {
                count += 1;
            }
        }
        count
    }

    /// Simulates the storage medium going away (or coming back). While
    /// unavailable every operation fails with [`EventStoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EventStoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    async fn existing_cell(&self, stream: &StreamId) -> Option<StreamCell> {
        self.streams.read().await.get(stream).cloned()
    }

    async fn cell_for_write(&self, stream: &StreamId) -> StreamCell {
        if let Some(cell) = self.existing_cell(stream).await {
            return cell;
        }
        self.streams
            .write()
            .await
            .entry(stream.clone())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[tracing::instrument(skip(self, events), fields(stream = %stream, count = events.len()))]
    async fn save_events(
        &self,
        stream: &StreamId,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
    ) -> Result<Version> {
        validate_events_for_append(stream, &events)?;
        self.ensure_available()?;

        let started = Instant::now();
        let cell = self.cell_for_write(stream).await;
        let mut stream_events = cell.write().await;

        let current_version = Version::new(stream_events.len() as i64);
        if let Err(conflict) = check_expected_version(stream, options, current_version) {
            metrics::counter!("event_store_concurrency_conflicts_total").increment(1);
            tracing::debug!(error = %conflict, "append rejected");
            return Err(conflict);
        }

        let count = events.len();
        let mut log = self.log.write().await;
        let first_position = log.len() as i64 + 1;
        let recorded: Vec<RecordedEvent> = events
            .into_iter()
            .enumerate()
            .map(|(offset, event)| RecordedEvent {
                version: current_version.advance_by(offset + 1),
                position: first_position + offset as i64,
                event,
            })
            .collect();

        log.extend(recorded.iter().cloned());
        stream_events.extend(recorded);
        drop(log);

        let new_version = current_version.advance_by(count);
        metrics::counter!("event_store_events_appended_total").increment(count as u64);
        metrics::histogram!("event_store_append_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(%new_version, "events appended");

        Ok(new_version)
    }

    async fn load_events(
        &self,
        stream: &StreamId,
        from_version: Option<Version>,
    ) -> Result<Vec<RecordedEvent>> {
        self.ensure_available()?;

        let Some(cell) = self.existing_cell(stream).await else {
            return Ok(Vec::new());
        };
        let events = cell.read().await;
        let skip = from_version.map_or(0, |v| v.as_i64().max(0) as usize);

        Ok(events.iter().skip(skip).cloned().collect())
    }

    async fn stream_version(&self, stream: &StreamId) -> Result<Version> {
        self.ensure_available()?;

        match self.existing_cell(stream).await {
            Some(cell) => Ok(Version::new(cell.read().await.len() as i64)),
            None => Ok(Version::initial()),
        }
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        self.ensure_available()?;
        let events = self.log.read().await.clone();

        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AggregateId;

    fn create_test_event(stream: &StreamId, event_type: &str) -> EventEnvelope {
        EventEnvelope::new(stream, event_type, serde_json::json!({"test": true}))
    }

    fn test_stream() -> StreamId {
        StreamId::new(AggregateId::new(), "TestAggregate")
    }

    fn event_types(events: &[RecordedEvent]) -> Vec<&str> {
        events.iter().map(|e| e.event_type()).collect()
    }

    #[tokio::test]
    async fn append_single_event() {
        let store = InMemoryEventStore::new();
        let stream = test_stream();
        let event = create_test_event(&stream, "TestEvent");

        let result = store
            .save_events(&stream, vec![event], AppendOptions::expect_new())
            .await;
        assert_eq!(result.unwrap(), Version::first());

        let events = store.load_events(&stream, None).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].version, Version::first());
    }

    #[tokio::test]
    async fn append_multiple_events_assigns_sequential_versions() {
        let store = InMemoryEventStore::new();
        let stream = test_stream();

        let events = vec![
            create_test_event(&stream, "Event1"),
            create_test_event(&stream, "Event2"),
            create_test_event(&stream, "Event3"),
        ];

        let result = store
            .save_events(&stream, events, AppendOptions::expect_new())
            .await;
        assert_eq!(result.unwrap(), Version::new(3));

        let stored = store.load_events(&stream, None).await.unwrap();
        let versions: Vec<i64> = stored.iter().map(|e| e.version.as_i64()).collect();
        assert_eq!(versions, vec![1, 2, 3]);
        assert_eq!(event_types(&stored), vec!["Event1", "Event2", "Event3"]);
    }

    #[tokio::test]
    async fn concurrency_conflict_on_wrong_version_commits_nothing() {
        let store = InMemoryEventStore::new();
        let stream = test_stream();

        store
            .save_events(
                &stream,
                vec![create_test_event(&stream, "Event1")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        let result = store
            .save_events(
                &stream,
                vec![
                    create_test_event(&stream, "Event2"),
                    create_test_event(&stream, "Event3"),
                ],
                AppendOptions::expect_version(Version::initial()),
            )
            .await;

        match result {
            Err(EventStoreError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Version::initial());
                assert_eq!(actual, Version::first());
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        let stored = store.load_events(&stream, None).await.unwrap();
        assert_eq!(event_types(&stored), vec!["Event1"]);
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn append_without_expected_version_is_unconditional() {
        let store = InMemoryEventStore::new();
        let stream = test_stream();

        store
            .save_events(&stream, vec![create_test_event(&stream, "A")], AppendOptions::new())
            .await
            .unwrap();
        let version = store
            .save_events(
                &stream,
                vec![create_test_event(&stream, "B"), create_test_event(&stream, "C")],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(version, Version::new(3));
    }

    #[tokio::test]
    async fn streams_are_keyed_by_id_and_type() {
        let store = InMemoryEventStore::new();
        let order = StreamId::new("shared-1", "Order");
        let invoice = StreamId::new("shared-1", "Invoice");

        store
            .save_events(&order, vec![create_test_event(&order, "OrderCreated")], AppendOptions::expect_new())
            .await
            .unwrap();
        store
            .save_events(
                &invoice,
                vec![create_test_event(&invoice, "InvoiceIssued")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        assert_eq!(store.stream_version(&order).await.unwrap(), Version::first());
        assert_eq!(store.stream_version(&invoice).await.unwrap(), Version::first());
        assert_eq!(store.stream_count().await, 2);
    }

    #[tokio::test]
    async fn invalid_batches_are_rejected() {
        let store = InMemoryEventStore::new();
        let stream = test_stream();
        let other = test_stream();

        let empty = store
            .save_events(&stream, vec![], AppendOptions::new())
            .await;
        assert!(matches!(empty, Err(EventStoreError::InvalidAppend(_))));

        let foreign = store
            .save_events(&stream, vec![create_test_event(&other, "X")], AppendOptions::new())
            .await;
        assert!(matches!(foreign, Err(EventStoreError::InvalidAppend(_))));
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn load_events_skips_up_to_from_version() {
        let store = InMemoryEventStore::new();
        let stream = test_stream();

        let events = vec![
            create_test_event(&stream, "Event1"),
            create_test_event(&stream, "Event2"),
            create_test_event(&stream, "Event3"),
        ];
        store
            .save_events(&stream, events, AppendOptions::new())
            .await
            .unwrap();

        let after_v1 = store
            .load_events(&stream, Some(Version::new(1)))
            .await
            .unwrap();
        assert_eq!(event_types(&after_v1), vec!["Event2", "Event3"]);
        assert_eq!(after_v1[0].version, Version::new(2));

        let after_all = store
            .load_events(&stream, Some(Version::new(3)))
            .await
            .unwrap();
        assert!(after_all.is_empty());
    }

    #[tokio::test]
    async fn unknown_stream_loads_empty() {
        let store = InMemoryEventStore::new();
        let stream = test_stream();

        assert!(store.load_events(&stream, None).await.unwrap().is_empty());
        assert_eq!(store.stream_version(&stream).await.unwrap(), Version::initial());
    }

    #[tokio::test]
    async fn stream_all_events_follows_commit_order() {
        use futures_util::StreamExt;

        let store = InMemoryEventStore::new();
        let s1 = test_stream();
        let s2 = test_stream();

        store
            .save_events(&s1, vec![create_test_event(&s1, "Event1")], AppendOptions::new())
            .await
            .unwrap();
        store
            .save_events(&s2, vec![create_test_event(&s2, "Event2")], AppendOptions::new())
            .await
            .unwrap();
        store
            .save_events(&s1, vec![create_test_event(&s1, "Event3")], AppendOptions::new())
            .await
            .unwrap();

        let stream = store.stream_all_events().await.unwrap();
        let events: Vec<_> = stream.collect().await;
        let events: Vec<RecordedEvent> = events.into_iter().map(|e| e.unwrap()).collect();

        assert_eq!(event_types(&events), vec!["Event1", "Event2", "Event3"]);
        let positions: Vec<i64> = events.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn unavailable_store_reports_storage_failure() {
        let store = InMemoryEventStore::new();
        let stream = test_stream();
        store.set_unavailable(true);

        let err = store
            .save_events(&stream, vec![create_test_event(&stream, "E")], AppendOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_storage_failure());
        assert!(store.ping().await.is_err());

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
        assert_eq!(store.event_count().await, 0);
    }
}
