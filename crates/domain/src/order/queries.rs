//! Order queries.

use common::AggregateId;

use crate::message::{Query, QueryMetadata};

/// Loads the current state of one order.
#[derive(Debug, Clone)]
pub struct GetOrder {
    pub order_id: AggregateId,
    pub metadata: QueryMetadata,
}

impl GetOrder {
    pub fn new(order_id: AggregateId) -> Self {
        Self {
            order_id,
            metadata: QueryMetadata::new(),
        }
    }
}

impl Query for GetOrder {
    fn metadata(&self) -> &QueryMetadata {
        &self.metadata
    }
}

/// Loads the recorded event history of one order.
#[derive(Debug, Clone)]
pub struct GetOrderHistory {
    pub order_id: AggregateId,
    pub metadata: QueryMetadata,
}

impl GetOrderHistory {
    pub fn new(order_id: AggregateId) -> Self {
        Self {
            order_id,
            metadata: QueryMetadata::new(),
        }
    }
}

impl Query for GetOrderHistory {
    fn metadata(&self) -> &QueryMetadata {
        &self.metadata
    }
}
