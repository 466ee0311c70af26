//! Events emitted by the delivery service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StartedDelivery;

/// Published to the delivery topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStartedEvent {
    pub restaurant_id: String,
    pub customer_phone: String,
    pub driver_id: String,
    pub route: String,
    pub started_at: DateTime<Utc>,
}

impl From<&StartedDelivery> for DeliveryStartedEvent {
    fn from(delivery: &StartedDelivery) -> Self {
        let assignment = &delivery.assignment;
        Self {
            restaurant_id: assignment.invoice.restaurant_id.clone(),
            customer_phone: assignment.invoice.customer_phone.clone(),
            driver_id: assignment.driver.as_str().to_string(),
            route: assignment.route.as_str().to_string(),
            started_at: delivery.started_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryFailedEvent {
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Outcome of dispatching a delivery. Serializes as the inner event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeliveryEvent {
    Started(DeliveryStartedEvent),
    Failed(DeliveryFailedEvent),
}

impl DeliveryEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DeliveryEvent::Started(_) => "DeliveryStarted",
            DeliveryEvent::Failed(_) => "DeliveryFailed",
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            DeliveryEvent::Started(_) => None,
            DeliveryEvent::Failed(failed) => Some(&failed.reason),
        }
    }
}
