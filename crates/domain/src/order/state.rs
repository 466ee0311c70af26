//! Order variants.
//!
//! ```text
//! Unvalidated ──► Validated ──► Enriched ──► Placed
//!      │
//!      └──► Invalid
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::StoredEntity;

use super::{CustomerPhone, DeliveryAddress, OrderAmount, RestaurantId};
use crate::pipeline::{FailureKind, Phase, Variant};

/// An order at one stage of placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data")]
pub enum Order {
    /// Raw fields straight from the command.
    Unvalidated(UnvalidatedOrder),
    /// All value objects constructed.
    Validated(OrderDetails),
    /// Reference and delivery estimate assigned.
    Enriched(EnrichedOrder),
    /// Terminal success.
    Placed(PlacedOrder),
    /// Terminal failure with every validation error.
    Invalid(InvalidOrder),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnvalidatedOrder {
    pub restaurant_id: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub order_amount: Decimal,
}

/// Validated order fields, carried unchanged by every later state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub restaurant: RestaurantId,
    pub phone: CustomerPhone,
    pub address: DeliveryAddress,
    pub amount: OrderAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedOrder {
    pub details: OrderDetails,
    /// `ORD-YYYYMMDD-XXXXXXXX`.
    pub order_reference: String,
    pub order_date: DateTime<Utc>,
    pub estimated_delivery_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub details: OrderDetails,
    pub order_reference: String,
    pub estimated_delivery_at: DateTime<Utc>,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidOrder {
    pub reason: String,
}

impl Variant for Order {
    const ENTITY: &'static str = "Order";

    fn state(&self) -> &'static str {
        match self {
            Order::Unvalidated(_) => "Unvalidated",
            Order::Validated(_) => "Validated",
            Order::Enriched(_) => "Enriched",
            Order::Placed(_) => "Placed",
            Order::Invalid(_) => "Invalid",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Order::Unvalidated(_) => 0,
            Order::Validated(_) => 1,
            Order::Enriched(_) => 2,
            Order::Placed(_) => 3,
            Order::Invalid(_) => u8::MAX,
        }
    }

    fn phase(&self) -> Phase {
        match self {
            Order::Unvalidated(_) | Order::Validated(_) | Order::Enriched(_) => Phase::Intermediate,
            Order::Placed(_) => Phase::Succeeded,
            Order::Invalid(_) => Phase::Failed(FailureKind::Structural),
        }
    }

    fn failure_reason(&self) -> Option<&str> {
        match self {
            Order::Invalid(invalid) => Some(&invalid.reason),
            _ => None,
        }
    }
}

impl StoredEntity for Order {
    const KIND: &'static str = "Order";

    fn status(&self) -> &'static str {
        self.state()
    }

    fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }

    fn filter_key(&self) -> Option<&str> {
        match self {
            Order::Unvalidated(order) => Some(&order.customer_phone),
            Order::Validated(details) => Some(details.phone.as_str()),
            Order::Enriched(order) => Some(order.details.phone.as_str()),
            Order::Placed(order) => Some(order.details.phone.as_str()),
            Order::Invalid(_) => None,
        }
    }
}
