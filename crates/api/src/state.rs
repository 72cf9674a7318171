//! Shared application state.

use std::sync::Arc;

use common::AggregateId;
use domain::{EventStoreHealthCheck, HealthRegistry, Instrumented, OrderService};
use event_store::EventStore;
use projections::{OrderSummary, OrderSummaryProjection, ProjectionProcessor, Repository};

use crate::config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore, R> {
    pub orders: Instrumented<OrderService<S>>,
    pub order_summaries: R,
    pub projection_processor: ProjectionProcessor<S>,
    pub health: HealthRegistry,
}

impl<S, R> AppState<S, R>
where
    S: EventStore + Clone + 'static,
    R: Repository<OrderSummary, AggregateId> + Clone + 'static,
{
    /// Wires the order use cases, the summary projection and the health
    /// checks around one event store and one summary repository.
    pub fn new(event_store: S, order_summaries: R, config: &Config) -> Self {
        let projection_processor = ProjectionProcessor::new(event_store.clone())
            .with_projection(Box::new(OrderSummaryProjection::new(order_summaries.clone())));

        let health = HealthRegistry::new().with_check(Arc::new(
            EventStoreHealthCheck::new(event_store.clone())
                .with_timeout(config.health_timeout)
                .degraded_after(config.health_degraded_after),
        ));

        Self {
            orders: Instrumented::new(OrderService::new(event_store)),
            order_summaries,
            projection_processor,
            health,
        }
    }
}
