//! Inbound payload of the delivery service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RequestedDelivery;

/// An invoice issued event as read from the billing topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceIssuedMessage {
    pub restaurant_id: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub amount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub issued_at: Option<DateTime<Utc>>,
}

impl From<InvoiceIssuedMessage> for RequestedDelivery {
    fn from(message: InvoiceIssuedMessage) -> Self {
        Self {
            restaurant_id: message.restaurant_id,
            customer_phone: message.customer_phone,
            delivery_address: message.delivery_address,
            invoice_total: message.total,
        }
    }
}
