//! Delivery variants.
//!
//! ```text
//! Requested ──► Assigned ──► Optimized ──► Started
//!     │
//!     └──► Failed
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::StoredEntity;

use super::{DeliveryDestination, DeliveryRoute, DriverId, InvoiceReference, InvoiceTotal};
use crate::pipeline::{FailureKind, Phase, Variant};

/// A delivery at one stage of dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data")]
pub enum Delivery {
    Requested(RequestedDelivery),
    /// Driver and route assigned.
    Assigned(AssignedDelivery),
    /// Distance and duration estimated.
    Optimized(OptimizedDelivery),
    Started(StartedDelivery),
    Failed(FailedDelivery),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestedDelivery {
    pub restaurant_id: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub invoice_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedDelivery {
    pub invoice: InvoiceReference,
    pub destination: DeliveryDestination,
    pub invoice_total: InvoiceTotal,
    pub driver: DriverId,
    pub route: DeliveryRoute,
}

/// Estimated trip length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub distance_km: Decimal,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedDelivery {
    pub assignment: AssignedDelivery,
    pub estimate: RouteEstimate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartedDelivery {
    pub assignment: AssignedDelivery,
    pub estimate: RouteEstimate,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDelivery {
    pub reason: String,
}

impl Variant for Delivery {
    const ENTITY: &'static str = "Delivery";

    fn state(&self) -> &'static str {
        match self {
            Delivery::Requested(_) => "Requested",
            Delivery::Assigned(_) => "Assigned",
            Delivery::Optimized(_) => "Optimized",
            Delivery::Started(_) => "Started",
            Delivery::Failed(_) => "Failed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Delivery::Requested(_) => 0,
            Delivery::Assigned(_) => 1,
            Delivery::Optimized(_) => 2,
            Delivery::Started(_) => 3,
            Delivery::Failed(_) => u8::MAX,
        }
    }

    fn phase(&self) -> Phase {
        match self {
            Delivery::Requested(_) | Delivery::Assigned(_) | Delivery::Optimized(_) => {
                Phase::Intermediate
            }
            Delivery::Started(_) => Phase::Succeeded,
            Delivery::Failed(_) => Phase::Failed(FailureKind::Structural),
        }
    }

    fn failure_reason(&self) -> Option<&str> {
        match self {
            Delivery::Failed(failed) => Some(&failed.reason),
            _ => None,
        }
    }
}

impl StoredEntity for Delivery {
    const KIND: &'static str = "Delivery";

    fn status(&self) -> &'static str {
        self.state()
    }

    fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }

    fn filter_key(&self) -> Option<&str> {
        match self {
            Delivery::Requested(delivery) => Some(&delivery.customer_phone),
            Delivery::Assigned(assigned) => Some(&assigned.invoice.customer_phone),
            Delivery::Optimized(optimized) => Some(&optimized.assignment.invoice.customer_phone),
            Delivery::Started(started) => Some(&started.assignment.invoice.customer_phone),
            Delivery::Failed(_) => None,
        }
    }
}
