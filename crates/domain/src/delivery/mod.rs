//! Delivery dispatch: consumes issued invoices, starts deliveries.

mod events;
mod messages;
mod operations;
mod state;
mod value_objects;
mod workflow;

pub use events::{DeliveryEvent, DeliveryFailedEvent, DeliveryStartedEvent};
pub use messages::InvoiceIssuedMessage;
pub use operations::{AssignDelivery, DeliveryOperation, OptimizeRoute, StartDelivery};
pub use state::{
    AssignedDelivery, Delivery, FailedDelivery, OptimizedDelivery, RequestedDelivery,
    RouteEstimate, StartedDelivery,
};
pub use value_objects::{DeliveryDestination, DeliveryRoute, DriverId, InvoiceReference, InvoiceTotal};
pub use workflow::DeliveryDispatch;

use thiserror::Error;

use crate::error::DomainError;

/// Average city speed used for duration estimates.
pub const AVERAGE_SPEED_KMH: u32 = 30;

/// Rejections raised by the delivery value objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Invalid invoice reference: Restaurant ID cannot be empty.")]
    EmptyRestaurantId,

    #[error("Invalid invoice reference: Customer phone cannot be empty.")]
    EmptyCustomerPhone,

    #[error("Invalid delivery destination: Address cannot be empty.")]
    EmptyDestination,

    #[error("Invalid delivery destination: Address must be at least 10 characters.")]
    DestinationTooShort,

    #[error("Invalid invoice total: Total must be greater than 0.")]
    InvalidTotal,

    #[error("Invalid driver ID: Must be in format DRV-XXXX where X is a digit.")]
    InvalidDriverId,

    #[error("Invalid delivery route: Route cannot be empty.")]
    EmptyRoute,
}

impl From<DeliveryError> for DomainError {
    fn from(err: DeliveryError) -> Self {
        DomainError::Validation(err.to_string())
    }
}
