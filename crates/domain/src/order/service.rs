//! Order use cases.

use async_trait::async_trait;
use common::AggregateId;
use event_store::{EventStore, RecordedEvent};

use crate::aggregate::Aggregate;
use crate::command::{Command, CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::message::Query;
use crate::use_case::UseCase;

use super::{CancelOrder, GetOrder, GetOrderHistory, Order, OrderError, PayOrder, PlaceOrder};

impl From<OrderError> for DomainError {
    fn from(e: OrderError) -> Self {
        DomainError::Order(e)
    }
}

/// Service exposing every order operation as a [`UseCase`].
///
/// Requests are validated before any storage call. Writes go through a
/// [`CommandHandler`], so a concurrent writer on the same order surfaces as a
/// concurrency conflict and is not retried here.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }
}

fn require_id(order_id: &AggregateId) -> Result<(), DomainError> {
    if order_id.is_blank() {
        return Err(DomainError::validation("order id must not be blank"));
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be blank")));
    }
    Ok(())
}

/// Names the order when the aggregate reports it does not exist.
fn with_order_id(error: DomainError, order_id: &AggregateId) -> DomainError {
    match error {
        DomainError::Order(OrderError::NotFound) => DomainError::AggregateNotFound {
            aggregate_type: Order::aggregate_type(),
            aggregate_id: order_id.to_string(),
        },
        other => other,
    }
}

#[async_trait]
impl<S: EventStore> UseCase<PlaceOrder> for OrderService<S> {
    type Response = CommandResult<Order>;

    #[tracing::instrument(skip(self, command), fields(order_id = %command.order_id, command_id = %command.command_id()))]
    async fn execute(&self, command: PlaceOrder) -> Result<Self::Response, DomainError> {
        require_id(&command.order_id)?;
        require_text("customer id", &command.customer_id)?;
        if command.total_cents <= 0 {
            return Err(DomainError::validation(format!(
                "order total must be positive, got {}",
                command.total_cents
            )));
        }

        let order_id = command.order_id.clone();
        let customer_id = command.customer_id.clone();
        let total_cents = command.total_cents;

        self.handler
            .execute_command(&command, |order| {
                order.place(order_id, customer_id, total_cents)
            })
            .await
    }
}

#[async_trait]
impl<S: EventStore> UseCase<PayOrder> for OrderService<S> {
    type Response = CommandResult<Order>;

    #[tracing::instrument(skip(self, command), fields(order_id = %command.order_id, command_id = %command.command_id()))]
    async fn execute(&self, command: PayOrder) -> Result<Self::Response, DomainError> {
        require_id(&command.order_id)?;
        require_text("payment reference", &command.payment_reference)?;

        let reference = command.payment_reference.clone();
        self.handler
            .execute_command(&command, |order| order.pay(reference))
            .await
            .map_err(|e| with_order_id(e, &command.order_id))
    }
}

#[async_trait]
impl<S: EventStore> UseCase<CancelOrder> for OrderService<S> {
    type Response = CommandResult<Order>;

    #[tracing::instrument(skip(self, command), fields(order_id = %command.order_id, command_id = %command.command_id()))]
    async fn execute(&self, command: CancelOrder) -> Result<Self::Response, DomainError> {
        require_id(&command.order_id)?;
        require_text("cancellation reason", &command.reason)?;

        let reason = command.reason.clone();
        self.handler
            .execute_command(&command, |order| order.cancel(reason))
            .await
            .map_err(|e| with_order_id(e, &command.order_id))
    }
}

#[async_trait]
impl<S: EventStore> UseCase<GetOrder> for OrderService<S> {
    /// `None` when the order was never placed.
    type Response = Option<Order>;

    #[tracing::instrument(skip(self, query), fields(order_id = %query.order_id, query_id = %query.query_id()))]
    async fn execute(&self, query: GetOrder) -> Result<Self::Response, DomainError> {
        require_id(&query.order_id)?;
        self.handler.load_existing(&query.order_id).await
    }
}

#[async_trait]
impl<S: EventStore> UseCase<GetOrderHistory> for OrderService<S> {
    type Response = Vec<RecordedEvent>;

    #[tracing::instrument(skip(self, query), fields(order_id = %query.order_id, query_id = %query.query_id()))]
    async fn execute(&self, query: GetOrderHistory) -> Result<Self::Response, DomainError> {
        require_id(&query.order_id)?;
        self.handler.history(&query.order_id).await
    }
}
