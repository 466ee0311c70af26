//! Order placement and read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use common::EntityId;
use domain::OrderPlacement;
use domain::order::{Order, OrderEvent, OrderFailedEvent, PlaceOrderCommand, PlacedOrder};
use rust_decimal::Decimal;
use saga::{EventSender, FaultClass, Workflow, WorkflowOutcome};
use serde::{Deserialize, Serialize};
use store::Repository;

use crate::error::ApiError;

/// The order workflow as wired by the binary: storage and publishing are
/// chosen at startup.
pub type OrderWorkflow =
    Workflow<OrderPlacement, Arc<dyn Repository<Order>>, Arc<dyn EventSender>>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orders: OrderWorkflow,
    /// Storage backend name reported by `/health`.
    pub storage: &'static str,
}

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub phone: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_reference: String,
    pub restaurant_id: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub order_amount: Decimal,
    pub placed_at: DateTime<Utc>,
    pub estimated_delivery_at: DateTime<Utc>,
}

impl From<&PlacedOrder> for OrderResponse {
    fn from(order: &PlacedOrder) -> Self {
        Self {
            order_reference: order.order_reference.clone(),
            restaurant_id: order.details.restaurant.to_string(),
            customer_phone: order.details.phone.to_string(),
            delivery_address: order.details.address.as_str().to_string(),
            order_amount: order.details.amount.value(),
            placed_at: order.placed_at,
            estimated_delivery_at: order.estimated_delivery_at,
        }
    }
}

/// Body returned for a failed placement.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureResponse {
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

impl From<OrderFailedEvent> for FailureResponse {
    fn from(event: OrderFailedEvent) -> Self {
        Self {
            error: event.reason,
            failed_at: event.failed_at,
        }
    }
}

fn placed(order: &Order) -> Option<OrderResponse> {
    match order {
        Order::Placed(placed) => Some(OrderResponse::from(placed)),
        _ => None,
    }
}

fn failure_status(class: FaultClass) -> StatusCode {
    match class {
        FaultClass::NonRetriable => StatusCode::BAD_REQUEST,
        FaultClass::Transient => StatusCode::SERVICE_UNAVAILABLE,
        FaultClass::Unclassified => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(status: StatusCode, event: OrderEvent) -> Response {
    match event {
        OrderEvent::Failed(failed) => (status, Json(FailureResponse::from(failed))).into_response(),
        OrderEvent::Placed(_) => {
            tracing::error!("failed placement carried a success event");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// -- Handlers --

/// POST /orders: run order placement and return its event.
#[tracing::instrument(skip(state, command))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(command): Json<PlaceOrderCommand>,
) -> Response {
    let outcome = state.orders.run(command).await;
    metrics::counter!("api_orders_total", "outcome" => outcome.as_str()).increment(1);

    match outcome {
        WorkflowOutcome::Succeeded {
            event, entity_id, ..
        } => (
            StatusCode::CREATED,
            [(header::LOCATION, format!("/orders/{entity_id}"))],
            Json(event),
        )
            .into_response(),
        WorkflowOutcome::Rejected { event, .. } => failure(StatusCode::BAD_REQUEST, event),
        WorkflowOutcome::Faulted { event, fault } => failure(failure_status(fault.class()), event),
    }
}

/// GET /orders/{id}: load a placed order by row ID.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let uuid = uuid::Uuid::parse_str(&id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;

    state
        .orders
        .repository()
        .get_by_id(EntityId::from_uuid(uuid))
        .await?
        .as_ref()
        .and_then(placed)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))
}

/// GET /orders: list placed orders, optionally filtered by `?phone=`.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let repository = state.orders.repository();
    let orders = match query.phone.as_deref() {
        Some(phone) => repository.get_by_filter(phone).await?,
        None => repository.get_all().await?,
    };

    Ok(Json(orders.iter().filter_map(placed).collect()))
}
