//! Events emitted by the order service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PlacedOrder;

/// Published to the order topic and consumed by billing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacedEvent {
    pub restaurant_id: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub order_amount: Decimal,
    pub placed_at: DateTime<Utc>,
}

impl From<&PlacedOrder> for OrderPlacedEvent {
    fn from(order: &PlacedOrder) -> Self {
        Self {
            restaurant_id: order.details.restaurant.to_string(),
            customer_phone: order.details.phone.to_string(),
            delivery_address: order.details.address.as_str().to_string(),
            order_amount: order.details.amount.value(),
            placed_at: order.placed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFailedEvent {
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Outcome of placing an order. Serializes as the inner event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderEvent {
    Placed(OrderPlacedEvent),
    Failed(OrderFailedEvent),
}

impl OrderEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed(_) => "OrderPlaced",
            OrderEvent::Failed(_) => "OrderFailed",
        }
    }

    /// Failure reason, if this is a failure event.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            OrderEvent::Placed(_) => None,
            OrderEvent::Failed(failed) => Some(&failed.reason),
        }
    }
}
