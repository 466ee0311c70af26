//! Inbound payload of the order service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::UnvalidatedOrder;

/// Request to place an order. Missing fields default to empty so they are
/// reported by validation rather than rejected as malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceOrderCommand {
    pub restaurant_id: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub order_amount: Decimal,
}

impl From<PlaceOrderCommand> for UnvalidatedOrder {
    fn from(command: PlaceOrderCommand) -> Self {
        Self {
            restaurant_id: command.restaurant_id,
            customer_phone: command.customer_phone,
            delivery_address: command.delivery_address,
            order_amount: command.order_amount,
        }
    }
}
