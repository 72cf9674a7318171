use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventEnvelope, EventId, EventStoreError, RecordedEvent, Result, StreamId,
    Version,
    store::{
        AppendOptions, EventStore, EventStream, check_expected_version,
        validate_events_for_append,
    },
};

/// Advisory lock key taken around position allocation. Positions come from
/// a sequence at insert time, so inserts and commits are serialized to keep
/// commit order equal to position order.
const POSITION_LOCK_KEY: i64 = 0x6576_656e_7473;

const SELECT_EVENTS: &str = "SELECT position, id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata FROM events";

/// PostgreSQL-backed event store implementation.
///
/// Writers on a stream are serialized by a transaction-scoped advisory lock
/// keyed on the stream, so the version check and the inserts form one
/// compare-and-swap. The `unique_stream_version` constraint backs this up.
///
/// A second, global advisory lock is held from the first insert until commit.
/// Readers of the global log therefore never see position `n + 1` before
/// position `n`, which is what projections rely on when they skip every
/// position at or below the last one they handled.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<RecordedEvent> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        Ok(RecordedEvent {
            version: Version::new(row.try_get("version")?),
            position: row.try_get("position")?,
            event: EventEnvelope {
                event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
                event_type: row.try_get("event_type")?,
                aggregate_id: AggregateId::from(row.try_get::<String, _>("aggregate_id")?),
                aggregate_type: row.try_get("aggregate_type")?,
                timestamp: row.try_get("timestamp")?,
                payload: row.try_get("payload")?,
                metadata,
            },
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, events), fields(stream = %stream, count = events.len()))]
    async fn save_events(
        &self,
        stream: &StreamId,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
    ) -> Result<Version> {
        validate_events_for_append(stream, &events)?;

        let started = Instant::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(stream.to_string())
            .execute(&mut *tx)
            .await?;

        let current: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(version) FROM events WHERE aggregate_type = $1 AND aggregate_id = $2",
        )
        .bind(&stream.aggregate_type)
        .bind(stream.aggregate_id.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let current_version = Version::new(current.unwrap_or(0));

        if let Err(conflict) = check_expected_version(stream, options, current_version) {
            metrics::counter!("event_store_concurrency_conflicts_total").increment(1);
            tracing::debug!(error = %conflict, "append rejected");
            return Err(conflict);
        }

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(POSITION_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let count = events.len();
        for (offset, event) in events.iter().enumerate() {
            let version = current_version.advance_by(offset + 1);
            let metadata_json = serde_json::to_value(&event.metadata)?;

            sqlx::query(
                r#"
                INSERT INTO events (id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(&event.event_type)
            .bind(event.aggregate_id.as_str())
            .bind(&event.aggregate_type)
            .bind(version.as_i64())
            .bind(event.timestamp)
            .bind(&event.payload)
            .bind(metadata_json)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_stream_version")
                {
                    return EventStoreError::ConcurrencyConflict {
                        stream: stream.clone(),
                        expected: options.expected_version.unwrap_or(current_version),
                        actual: version,
                    };
                }
                EventStoreError::Database(e)
            })?;
        }

        tx.commit().await?;

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
        let rows = sqlx::query(&format!(
            "{SELECT_EVENTS} WHERE aggregate_type = $1 AND aggregate_id = $2 AND version > $3 ORDER BY version ASC"
        ))
        .bind(&stream.aggregate_type)
        .bind(stream.aggregate_id.as_str())
        .bind(from_version.unwrap_or_default().as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_version(&self, stream: &StreamId) -> Result<Version> {
        let version: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(version) FROM events WHERE aggregate_type = $1 AND aggregate_id = $2",
        )
        .bind(&stream.aggregate_type)
        .bind(stream.aggregate_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(Version::new(version.unwrap_or(0)))
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::StreamExt;

        let rows = sqlx::query(&format!("{SELECT_EVENTS} ORDER BY position ASC"))
            .fetch_all(&self.pool)
            .await?;

        let stream = futures_util::stream::iter(rows).map(Self::row_to_event);
        Ok(Box::pin(stream))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
