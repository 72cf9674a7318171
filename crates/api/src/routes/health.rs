//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::AggregateId;
use domain::{HealthReport, HealthStatus};
use event_store::EventStore;
use projections::{OrderSummary, Repository};

use crate::state::AppState;

/// GET /health — runs every registered check.
///
/// Degraded still answers 200 so load balancers keep routing; only an
/// unhealthy component turns the response into a 503.
#[tracing::instrument(skip(state))]
pub async fn check<S, R>(State(state): State<Arc<AppState<S, R>>>) -> (StatusCode, Json<HealthReport>)
where
    S: EventStore + Clone + 'static,
    R: Repository<OrderSummary, AggregateId> + Clone + 'static,
{
    let report = state.health.check_all().await;
    let status = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report))
}
