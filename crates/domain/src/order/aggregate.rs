//! Order aggregate implementation.

use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    OrderError, OrderEvent, OrderStatus,
    events::{OrderCreatedData, OrderPaidData},
};

/// Order aggregate root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    customer_id: String,

    total_cents: i64,

    status: OrderStatus,

    payment_reference: Option<String>,

    cancellation_reason: Option<String>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<&AggregateId> {
        self.id.as_ref()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderCreated(data) => self.apply_order_created(data),
            OrderEvent::OrderPaid(data) => self.apply_order_paid(data),
            OrderEvent::OrderCancelled(data) => {
                self.status = OrderStatus::Cancelled;
                self.cancellation_reason = Some(data.reason);
            }
        }
    }
}

// Query methods
impl Order {
    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn total_cents(&self) -> i64 {
        self.total_cents
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_reference.as_deref()
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn exists(&self) -> bool {
        self.id.is_some()
    }
}

// Command methods (return events)
impl Order {
    /// Places a new order.
    pub fn place(
        &self,
        order_id: AggregateId,
        customer_id: impl Into<String>,
        total_cents: i64,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.exists() {
            return Err(OrderError::AlreadyCreated);
        }

        Ok(vec![OrderEvent::order_created(
            order_id,
            customer_id,
            total_cents,
        )])
    }

    /// Records payment of the full order total.
    pub fn pay(&self, payment_reference: impl Into<String>) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_exists()?;
        if !self.status.can_pay() {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "pay",
            });
        }

        Ok(vec![OrderEvent::order_paid(
            payment_reference,
            self.total_cents,
        )])
    }

    /// Cancels an unpaid order.
    pub fn cancel(&self, reason: impl Into<String>) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_exists()?;
        if !self.status.can_cancel() {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "cancel",
            });
        }

        Ok(vec![OrderEvent::order_cancelled(reason)])
    }

    fn ensure_exists(&self) -> Result<(), OrderError> {
        if self.exists() {
            Ok(())
        } else {
            Err(OrderError::NotFound)
        }
    }
}

// Apply event helpers
impl Order {
    fn apply_order_created(&mut self, data: OrderCreatedData) {
        self.id = Some(data.order_id);
        self.customer_id = data.customer_id;
        self.total_cents = data.total_cents;
        self.status = OrderStatus::Placed;
    }

    fn apply_order_paid(&mut self, data: OrderPaidData) {
        self.status = OrderStatus::Paid;
        self.payment_reference = Some(data.payment_reference);
    }
}
