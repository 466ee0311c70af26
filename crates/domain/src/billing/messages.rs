//! Inbound payload of the billing service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::UnprocessedInvoice;

/// An order placed event as read from the order topic.
///
/// Missing fields default so that validation reports them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderPlacedMessage {
    pub restaurant_id: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub order_amount: Decimal,
    pub placed_at: Option<DateTime<Utc>>,
}

impl From<OrderPlacedMessage> for UnprocessedInvoice {
    fn from(message: OrderPlacedMessage) -> Self {
        Self {
            restaurant_id: message.restaurant_id,
            customer_phone: message.customer_phone,
            delivery_address: message.delivery_address,
            order_amount: message.order_amount,
        }
    }
}
