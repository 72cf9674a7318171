//! Order use-case endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::AggregateId;
use domain::{
    CancelOrder, CommandResult, GetOrder, GetOrderHistory, Order, PayOrder, PlaceOrder, UseCase,
};
use event_store::{EventStore, RecordedEvent};
use projections::{OrderSummary, Repository};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    /// Client-chosen order id; generated when absent.
    pub order_id: Option<String>,
    pub customer_id: String,
    pub total_cents: i64,
}

#[derive(Deserialize)]
pub struct PayOrderRequest {
    pub payment_reference: String,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub reason: String,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub total_cents: i64,
    pub payment_reference: Option<String>,
    pub version: i64,
}

impl OrderResponse {
    fn from_order(id: &AggregateId, order: &Order) -> Self {
        use domain::Aggregate;

        Self {
            id: id.to_string(),
            customer_id: order.customer_id().to_string(),
            status: order.status().to_string(),
            total_cents: order.total_cents(),
            payment_reference: order.payment_reference().map(String::from),
            version: order.version().as_i64(),
        }
    }

    fn from_result(id: &AggregateId, result: &CommandResult<Order>) -> Self {
        Self::from_order(id, &result.aggregate)
    }
}

// -- Handlers --

/// POST /orders — place a new order.
#[tracing::instrument(skip(state, req))]
pub async fn place<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    S: EventStore + Clone + 'static,
    R: Repository<OrderSummary, AggregateId> + Clone + 'static,
{
    let order_id = req.order_id.map(AggregateId::from).unwrap_or_default();
    let command = PlaceOrder::new(order_id.clone(), req.customer_id, req.total_cents);

    let result = state.orders.execute(command).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::from_result(&order_id, &result)),
    ))
}

/// POST /orders/{id}/pay — pay an order in full.
#[tracing::instrument(skip(state, req))]
pub async fn pay<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    Path(id): Path<String>,
    Json(req): Json<PayOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: EventStore + Clone + 'static,
    R: Repository<OrderSummary, AggregateId> + Clone + 'static,
{
    let order_id = AggregateId::from(id);
    let result = state
        .orders
        .execute(PayOrder::new(order_id.clone(), req.payment_reference))
        .await?;

    Ok(Json(OrderResponse::from_result(&order_id, &result)))
}

/// POST /orders/{id}/cancel — cancel an unpaid order.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    Path(id): Path<String>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: EventStore + Clone + 'static,
    R: Repository<OrderSummary, AggregateId> + Clone + 'static,
{
    let order_id = AggregateId::from(id);
    let result = state
        .orders
        .execute(CancelOrder::new(order_id.clone(), req.reason))
        .await?;

    Ok(Json(OrderResponse::from_result(&order_id, &result)))
}

/// GET /orders/{id} — rebuild an order from its events.
#[tracing::instrument(skip(state))]
pub async fn get<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: EventStore + Clone + 'static,
    R: Repository<OrderSummary, AggregateId> + Clone + 'static,
{
    let order_id = AggregateId::from(id);
    let order = state
        .orders
        .execute(GetOrder::new(order_id.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))?;

    Ok(Json(OrderResponse::from_order(&order_id, &order)))
}

/// GET /orders/{id}/events — the order's recorded events in stream order.
#[tracing::instrument(skip(state))]
pub async fn events<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<RecordedEvent>>, ApiError>
where
    S: EventStore + Clone + 'static,
    R: Repository<OrderSummary, AggregateId> + Clone + 'static,
{
    let history = state
        .orders
        .execute(GetOrderHistory::new(AggregateId::from(id)))
        .await?;

    Ok(Json(history))
}

/// GET /orders — open and paid orders from the summary read model.
#[tracing::instrument(skip(state))]
pub async fn list<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
) -> Result<Json<Vec<OrderSummary>>, ApiError>
where
    S: EventStore + Clone + 'static,
    R: Repository<OrderSummary, AggregateId> + Clone + 'static,
{
    // Catch up first so the read model includes the latest events
    state.projection_processor.run_catch_up().await?;

    Ok(Json(state.order_summaries.find_all().await?))
}
