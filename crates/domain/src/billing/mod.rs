//! Invoice issuance: consumes placed orders, publishes issued invoices.

mod events;
mod messages;
mod operations;
mod state;
mod value_objects;
mod workflow;

pub use events::{InvoiceEvent, InvoiceFailedEvent, InvoiceIssuedEvent};
pub use messages::OrderPlacedMessage;
pub use operations::{CalculateInvoice, InvoiceOperation, IssueInvoice, ValidateTax};
pub use state::{
    FailedInvoice, InvalidInvoice, Invoice, InvoiceDetails, IssuedInvoice, UnprocessedInvoice,
};
pub use value_objects::{CustomerRef, InvoiceAmount, RestaurantRef, TaxAmount, TotalAmount};
pub use workflow::InvoiceIssuance;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::error::DomainError;

/// Flat tax rate applied to every order.
pub const TAX_RATE: Decimal = dec!(0.10);

/// Highest effective tax rate the rule gate accepts.
pub const MAX_TAX_RATE: Decimal = dec!(0.30);

/// Rejections raised by the invoice value objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    #[error("Invalid order reference: Restaurant ID cannot be empty.")]
    EmptyRestaurantId,

    #[error("Invalid order reference: Customer phone cannot be empty.")]
    EmptyCustomerPhone,

    #[error("Invalid invoice amount: Amount must be greater than 0.")]
    InvalidAmount,

    #[error("Invalid tax amount: Tax must be 0 or greater.")]
    NegativeTax,

    #[error("Invalid total amount: Total must be greater than 0.")]
    InvalidTotal,

    #[error("Invalid total amount: Amount {0} is too large to invoice.")]
    AmountOverflow(Decimal),
}

impl From<InvoiceError> for DomainError {
    fn from(err: InvoiceError) -> Self {
        DomainError::Validation(err.to_string())
    }
}
