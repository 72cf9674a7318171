//! Health reporting for operational tooling.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

/// Health status of a component, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        };
        f.write_str(s)
    }
}

/// Point-in-time outcome of a health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
    pub timestamp: DateTime<Utc>,
}

impl HealthResult {
    fn with_status(status: HealthStatus) -> Self {
        Self {
            status,
            message: None,
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(HealthStatus::Healthy)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Degraded).with_message(message)
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Unhealthy).with_message(message)
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// A named check of one component.
///
/// `check` always resolves to a status. Failing to check is itself reported
/// as [`HealthStatus::Unhealthy`] with a message.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Stable identifier of the checked component.
    fn name(&self) -> &str;

    async fn check(&self) -> HealthResult;
}

/// Pings an event store under a timeout.
pub struct EventStoreHealthCheck<S> {
    store: S,
    timeout: Duration,
    degraded_after: Duration,
}

impl<S: EventStore> EventStoreHealthCheck<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: Duration::from_secs(2),
            degraded_after: Duration::from_millis(500),
        }
    }

    /// Fails the check when the ping takes longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reports degraded when the ping succeeds but takes `threshold` or longer.
    #[must_use]
    pub fn degraded_after(mut self, threshold: Duration) -> Self {
        self.degraded_after = threshold;
        self
    }
}

#[async_trait]
impl<S: EventStore> HealthCheck for EventStoreHealthCheck<S> {
    fn name(&self) -> &str {
        "event_store"
    }

    async fn check(&self) -> HealthResult {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.store.ping()).await;
        let elapsed = started.elapsed();

        let result = match outcome {
            Err(_) => HealthResult::unhealthy(format!(
                "event store did not answer within {}ms",
                self.timeout.as_millis()
            )),
            Ok(Err(error)) => HealthResult::unhealthy(error.to_string()),
            Ok(Ok(())) if elapsed >= self.degraded_after => {
                HealthResult::degraded("event store is responding slowly")
            }
            Ok(Ok(())) => HealthResult::healthy().with_message("event store is reachable"),
        };

        result.with_detail(
            "response_time_ms",
            serde_json::json!(elapsed.as_millis() as u64),
        )
    }
}

/// Combined outcome of every registered check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: BTreeMap<String, HealthResult>,
    pub timestamp: DateTime<Utc>,
}

/// Runs a set of health checks concurrently.
#[derive(Clone, Default)]
pub struct HealthRegistry {
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, check: Arc<dyn HealthCheck>) {
        self.checks.push(check);
    }

    #[must_use]
    pub fn with_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.register(check);
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Runs every check. The report carries the worst individual status;
    /// a check that panics counts as unhealthy.
    #[tracing::instrument(skip(self))]
    pub async fn check_all(&self) -> HealthReport {
        let handles: Vec<_> = self
            .checks
            .iter()
            .map(|check| {
                let check = Arc::clone(check);
                let name = check.name().to_string();
                (name, tokio::spawn(async move { check.check().await }))
            })
            .collect();

        let mut checks = BTreeMap::new();
        for (name, handle) in handles {
            let result = handle.await.unwrap_or_else(|join_error| {
                HealthResult::unhealthy(format!("health check aborted: {join_error}"))
            });
            if !result.is_healthy() {
                tracing::warn!(check = %name, status = %result.status, message = ?result.message, "health check not healthy");
            }
            checks.insert(name, result);
        }

        let status = checks
            .values()
            .map(|r| r.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        HealthReport {
            status,
            checks,
            timestamp: Utc::now(),
        }
    }
}
