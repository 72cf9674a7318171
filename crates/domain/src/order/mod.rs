//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod queries;
mod service;
mod state;

pub use aggregate::Order;
pub use commands::{CancelOrder, PayOrder, PlaceOrder};
pub use events::{OrderCancelledData, OrderCreatedData, OrderEvent, OrderPaidData};
pub use queries::{GetOrder, GetOrderHistory};
pub use service::OrderService;
pub use state::OrderStatus;

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order has never been placed.
    #[error("Order not found")]
    NotFound,

    /// The order was already placed.
    #[error("Order already created")]
    AlreadyCreated,

    /// The order's status does not allow the action.
    #[error("Invalid state transition: cannot {action} an order in {current} state")]
    InvalidStateTransition {
        current: OrderStatus,
        action: &'static str,
    },
}
