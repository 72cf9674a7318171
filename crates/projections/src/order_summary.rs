//! Order summary read model: one row per open or paid order.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Aggregate, Order, OrderEvent, OrderStatus};
use event_store::RecordedEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::repository::{Entity, Repository};

/// Denormalized view of one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: AggregateId,
    pub customer_id: String,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub payment_reference: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stream version of the last event folded into this row.
    pub version: i64,
}

impl Entity<AggregateId> for OrderSummary {
    fn id(&self) -> &AggregateId {
        &self.order_id
    }
}

/// Keeps [`OrderSummary`] rows in a repository up to date.
///
/// Cancelled orders are deleted from the repository. Events at or below a
/// row's recorded version are ignored, so replaying the log into a
/// repository that already holds rows does not double-apply anything.
#[derive(Clone)]
pub struct OrderSummaryProjection<R> {
    repository: R,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl<R> OrderSummaryProjection<R>
where
    R: Repository<OrderSummary, AggregateId>,
{
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            position: Arc::new(RwLock::new(ProjectionPosition::zero())),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    async fn apply(&self, recorded: &RecordedEvent) -> Result<()> {
        let order_id = &recorded.event.aggregate_id;
        let version = recorded.version.as_i64();
        let event: OrderEvent = serde_json::from_value(recorded.event.payload.clone())?;

        match event {
            OrderEvent::OrderCreated(data) => {
                if self.repository.find_by_id(order_id).await?.is_some() {
                    return Ok(());
                }
                self.repository
                    .save(OrderSummary {
                        order_id: data.order_id,
                        customer_id: data.customer_id,
                        total_cents: data.total_cents,
                        status: OrderStatus::Placed,
                        payment_reference: None,
                        placed_at: data.created_at,
                        updated_at: data.created_at,
                        version,
                    })
                    .await?;
            }
            OrderEvent::OrderPaid(data) => {
                let Some(mut summary) = self.repository.find_by_id(order_id).await? else {
                    tracing::warn!(%order_id, "payment for an order missing from the read model");
                    return Ok(());
                };
                if summary.version >= version {
                    return Ok(());
                }
                summary.status = OrderStatus::Paid;
                summary.payment_reference = Some(data.payment_reference);
                summary.updated_at = data.paid_at;
                summary.version = version;
                self.repository.save(summary).await?;
            }
            OrderEvent::OrderCancelled(_) => {
                self.repository.delete(order_id).await?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<R> Projection for OrderSummaryProjection<R>
where
    R: Repository<OrderSummary, AggregateId>,
{
    fn name(&self) -> &'static str {
        "OrderSummaryProjection"
    }

    async fn handle(&self, event: &RecordedEvent) -> Result<()> {
        if event.event.aggregate_type == Order::aggregate_type() {
            self.apply(event).await?;
        }

        let mut pos = self.position.write().await;
        *pos = pos.advance_to(event.position);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        for summary in self.repository.find_all().await? {
            self.repository.delete(&summary.order_id).await?;
        }
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}
