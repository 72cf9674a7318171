//! Domain layer for the event-sourcing system.
//!
//! This crate provides the core domain abstractions including:
//! - Aggregate and DomainEvent traits for event-sourced entities
//! - Command/Query messages and the CommandHandler
//! - The UseCase contract and health reporting
//! - A sample Order aggregate with its use cases

pub mod aggregate;
pub mod command;
pub mod error;
pub mod health;
pub mod message;
pub mod order;
pub mod use_case;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
pub use health::{
    EventStoreHealthCheck, HealthCheck, HealthRegistry, HealthReport, HealthResult, HealthStatus,
};
pub use message::{CommandId, CommandMetadata, Query, QueryId, QueryMetadata};
pub use order::{
    CancelOrder, GetOrder, GetOrderHistory, Order, OrderError, OrderEvent, OrderService,
    OrderStatus, PayOrder, PlaceOrder,
};
pub use use_case::{Instrumented, UseCase};
