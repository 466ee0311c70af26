//! Order placement: the entry service of the saga.

mod commands;
mod events;
mod operations;
mod state;
mod value_objects;
mod workflow;

pub use commands::PlaceOrderCommand;
pub use events::{OrderEvent, OrderFailedEvent, OrderPlacedEvent};
pub use operations::{EnrichOrder, OrderOperation, PlaceOrder, ValidateOrder};
pub use state::{EnrichedOrder, InvalidOrder, Order, OrderDetails, PlacedOrder, UnvalidatedOrder};
pub use value_objects::{CustomerPhone, DeliveryAddress, OrderAmount, RestaurantId};
pub use workflow::OrderPlacement;

use thiserror::Error;

use crate::error::DomainError;

/// Rejections raised by the order value objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Invalid restaurant ID: Restaurant ID cannot be empty.")]
    EmptyRestaurantId,

    #[error("Invalid restaurant ID: Must be in format REST-XXXX where X is a digit.")]
    InvalidRestaurantId,

    #[error("Invalid phone number: Phone number cannot be empty.")]
    EmptyPhone,

    #[error("Invalid phone number: Must be 10 digits.")]
    InvalidPhone,

    #[error("Invalid delivery address: Address cannot be empty.")]
    EmptyAddress,

    #[error("Invalid delivery address: Address must be at least 10 characters.")]
    AddressTooShort,

    #[error("Invalid order amount: Amount must be greater than 0.")]
    InvalidAmount,
}

impl From<OrderError> for DomainError {
    fn from(err: OrderError) -> Self {
        DomainError::Validation(err.to_string())
    }
}
