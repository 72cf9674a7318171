//! Order commands.

use common::AggregateId;

use crate::command::Command;
use crate::message::CommandMetadata;

use super::Order;

/// Places a new order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: AggregateId,
    pub customer_id: String,
    pub total_cents: i64,
    pub metadata: CommandMetadata,
}

impl PlaceOrder {
    pub fn new(order_id: AggregateId, customer_id: impl Into<String>, total_cents: i64) -> Self {
        Self {
            order_id,
            customer_id: customer_id.into(),
            total_cents,
            metadata: CommandMetadata::new(),
        }
    }

    /// Places an order under a freshly generated id.
    pub fn for_customer(customer_id: impl Into<String>, total_cents: i64) -> Self {
        Self::new(AggregateId::new(), customer_id, total_cents)
    }
}

impl Command for PlaceOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> &AggregateId {
        &self.order_id
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }
}

/// Pays an existing order in full.
#[derive(Debug, Clone)]
pub struct PayOrder {
    pub order_id: AggregateId,
    pub payment_reference: String,
    pub metadata: CommandMetadata,
}

impl PayOrder {
    pub fn new(order_id: AggregateId, payment_reference: impl Into<String>) -> Self {
        Self {
            order_id,
            payment_reference: payment_reference.into(),
            metadata: CommandMetadata::new(),
        }
    }
}

impl Command for PayOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> &AggregateId {
        &self.order_id
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }
}

/// Cancels an unpaid order.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: AggregateId,
    pub reason: String,
    pub metadata: CommandMetadata,
}

impl CancelOrder {
    pub fn new(order_id: AggregateId, reason: impl Into<String>) -> Self {
        Self {
            order_id,
            reason: reason.into(),
            metadata: CommandMetadata::new(),
        }
    }
}

impl Command for CancelOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> &AggregateId {
        &self.order_id
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }
}
