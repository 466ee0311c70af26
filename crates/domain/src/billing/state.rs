//! Invoice variants.
//!
//! ```text
//! Unprocessed ──► Calculated ──► Validated ──► Issued
//!      │               │
//!      └──► Invalid    └──► Failed
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::StoredEntity;

use super::{CustomerRef, InvoiceAmount, RestaurantRef, TaxAmount, TotalAmount};
use crate::pipeline::{FailureKind, Phase, Variant};

/// An invoice at one stage of issuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data")]
pub enum Invoice {
    Unprocessed(UnprocessedInvoice),
    /// Tax and total computed.
    Calculated(InvoiceDetails),
    /// Tax rate passed the rule gate.
    Validated(InvoiceDetails),
    Issued(IssuedInvoice),
    /// Structural validation failed.
    Invalid(InvalidInvoice),
    /// A business rule rejected the computed figures.
    Failed(FailedInvoice),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnprocessedInvoice {
    pub restaurant_id: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub order_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDetails {
    pub restaurant: RestaurantRef,
    pub customer: CustomerRef,
    /// Passed through to delivery.
    pub delivery_address: String,
    pub amount: InvoiceAmount,
    pub tax: TaxAmount,
    pub total: TotalAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedInvoice {
    pub details: InvoiceDetails,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidInvoice {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedInvoice {
    pub reason: String,
}

impl Variant for Invoice {
    const ENTITY: &'static str = "Invoice";

    fn state(&self) -> &'static str {
        match self {
            Invoice::Unprocessed(_) => "Unprocessed",
            Invoice::Calculated(_) => "Calculated",
            Invoice::Validated(_) => "Validated",
            Invoice::Issued(_) => "Issued",
            Invoice::Invalid(_) => "Invalid",
            Invoice::Failed(_) => "Failed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Invoice::Unprocessed(_) => 0,
            Invoice::Calculated(_) => 1,
            Invoice::Validated(_) => 2,
            Invoice::Issued(_) => 3,
            Invoice::Invalid(_) | Invoice::Failed(_) => u8::MAX,
        }
    }

    fn phase(&self) -> Phase {
        match self {
            Invoice::Unprocessed(_) | Invoice::Calculated(_) | Invoice::Validated(_) => {
                Phase::Intermediate
            }
            Invoice::Issued(_) => Phase::Succeeded,
            Invoice::Invalid(_) => Phase::Failed(FailureKind::Structural),
            Invoice::Failed(_) => Phase::Failed(FailureKind::BusinessRule),
        }
    }

    fn failure_reason(&self) -> Option<&str> {
        match self {
            Invoice::Invalid(InvalidInvoice { reason }) | Invoice::Failed(FailedInvoice { reason }) => {
                Some(reason)
            }
            _ => None,
        }
    }
}

impl StoredEntity for Invoice {
    const KIND: &'static str = "Invoice";

    fn status(&self) -> &'static str {
        self.state()
    }

    fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }

    fn filter_key(&self) -> Option<&str> {
        match self {
            Invoice::Unprocessed(invoice) => Some(&invoice.customer_phone),
            Invoice::Calculated(details) | Invoice::Validated(details) => {
                Some(details.customer.as_str())
            }
            Invoice::Issued(issued) => Some(issued.details.customer.as_str()),
            Invoice::Invalid(_) | Invoice::Failed(_) => None,
        }
    }
}
