//! Projection processor for feeding events to projections.

use event_store::{EventStore, RecordedEvent};
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Processes events from an event store and delivers them to projections.
///
/// The processor supports:
/// - Catch-up: replays the global log, skipping what each projection has seen
/// - Single event delivery: delivers a freshly recorded event
/// - Rebuild: resets all projections and replays from scratch
///
/// Runs are serialized: a delivery never overlaps another catch-up, single
/// delivery or rebuild on the same processor.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
    running: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            running: Mutex::new(()),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    #[must_use]
    pub fn with_projection(mut self, projection: Box<dyn Projection>) -> Self {
        self.register(projection);
        self
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Streams the global log and delivers every event a projection has not
    /// handled yet. Returns the number of deliveries made.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let _running = self.running.lock().await;
        self.catch_up().await
    }

    /// Delivers one recorded event to every projection that is behind it.
    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type(), position = event.position))]
    pub async fn process_event(&self, event: &RecordedEvent) -> Result<()> {
        let _running = self.running.lock().await;
        self.deliver(event).await?;
        Ok(())
    }

    /// Resets all projections and replays all events from the store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        let _running = self.running.lock().await;
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.catch_up().await
    }

    async fn catch_up(&self) -> Result<u64> {
        let mut stream = self.store.stream_all_events().await?;
        let mut delivered: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            delivered += self.deliver(&event).await?;
        }

        tracing::info!(delivered, "catch-up complete");
        Ok(delivered)
    }

    async fn deliver(&self, event: &RecordedEvent) -> Result<u64> {
        let mut delivered = 0;
        for projection in &self.projections {
            if projection.position().await.is_behind(event.position) {
                projection.handle(event).await?;
                metrics::counter!("projections_events_processed", "projection" => projection.name())
                    .increment(1);
                delivered += 1;
            }
        }
        Ok(delivered)
    }
}
