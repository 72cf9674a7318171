//! API server entry point.

use std::sync::Arc;

use api::{AppState, Config, LogFormat};
use common::AggregateId;
use event_store::{EventStore, InMemoryEventStore, PostgresEventStore};
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{InMemoryRepository, OrderSummary, PostgresRepository, Repository};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const ORDER_SUMMARIES: &str = "order_summaries";

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Plain => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve<S, R>(event_store: S, order_summaries: R, config: Config, metrics: PrometheusHandle)
where
    S: EventStore + Clone + 'static,
    R: Repository<OrderSummary, AggregateId> + Clone + 'static,
{
    let state = Arc::new(AppState::new(event_store, order_summaries, &config));

    // Replay existing events into the read model before taking traffic
    let delivered = state
        .projection_processor
        .run_catch_up()
        .await
        .expect("projection catch-up failed");
    tracing::info!(delivered, "read model caught up");

    let app = api::create_app(state, metrics);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    init_tracing(&config);

    let metrics = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    match config.database_url.clone() {
        Some(url) => {
            tracing::info!("using PostgreSQL storage");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to PostgreSQL");

            let event_store = PostgresEventStore::new(pool.clone());
            event_store
                .run_migrations()
                .await
                .expect("failed to run migrations");

            let summaries = PostgresRepository::new(pool, ORDER_SUMMARIES);
            serve(event_store, summaries, config, metrics).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory storage");
            serve(
                InMemoryEventStore::new(),
                InMemoryRepository::new(),
                config,
                metrics,
            )
            .await;
        }
    }
}
