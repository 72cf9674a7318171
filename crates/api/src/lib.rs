//! HTTP surface for the order use cases.
//!
//! Provides REST endpoints for placing, paying and cancelling orders, a
//! health report and Prometheus metrics, with structured logging (tracing).

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use common::AggregateId;
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{InMemoryRepository, OrderSummary, Repository};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, LogFormat};
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, R>(state: Arc<AppState<S, R>>, metrics_handle: PrometheusHandle) -> Router
where
    S: EventStore + Clone + 'static,
    R: Repository<OrderSummary, AggregateId> + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S, R>))
        .route(
            "/orders",
            post(routes::orders::place::<S, R>).get(routes::orders::list::<S, R>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S, R>))
        .route("/orders/{id}/pay", post(routes::orders::pay::<S, R>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S, R>))
        .route("/orders/{id}/events", get(routes::orders::events::<S, R>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over `event_store` with an in-memory summary
/// repository and default health thresholds.
pub fn create_default_state<S>(
    event_store: S,
) -> Arc<AppState<S, InMemoryRepository<OrderSummary, AggregateId>>>
where
    S: EventStore + Clone + 'static,
{
    Arc::new(AppState::new(
        event_store,
        InMemoryRepository::new(),
        &Config::default(),
    ))
}
