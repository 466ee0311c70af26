//! Events emitted by the billing service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::IssuedInvoice;

/// Published to the billing topic and consumed by delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceIssuedEvent {
    pub restaurant_id: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub amount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub issued_at: DateTime<Utc>,
}

impl From<&IssuedInvoice> for InvoiceIssuedEvent {
    fn from(invoice: &IssuedInvoice) -> Self {
        let details = &invoice.details;
        Self {
            restaurant_id: details.restaurant.as_str().to_string(),
            customer_phone: details.customer.as_str().to_string(),
            delivery_address: details.delivery_address.clone(),
            amount: details.amount.value(),
            tax: details.tax.value(),
            total: details.total.value(),
            issued_at: invoice.issued_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFailedEvent {
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Outcome of issuing an invoice. Serializes as the inner event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvoiceEvent {
    Issued(InvoiceIssuedEvent),
    Failed(InvoiceFailedEvent),
}

impl InvoiceEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::Issued(_) => "InvoiceIssued",
            InvoiceEvent::Failed(_) => "InvoiceFailed",
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            InvoiceEvent::Issued(_) => None,
            InvoiceEvent::Failed(failed) => Some(&failed.reason),
        }
    }
}
