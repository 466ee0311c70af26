//! Value objects for the billing domain.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::InvoiceError;

/// Restaurant the invoiced order belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RestaurantRef(String);

impl RestaurantRef {
    pub fn parse(value: &str) -> Result<Self, InvoiceError> {
        if value.trim().is_empty() {
            return Err(InvoiceError::EmptyRestaurantId);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RestaurantRef {
    type Error = InvoiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RestaurantRef> for String {
    fn from(value: RestaurantRef) -> Self {
        value.0
    }
}

/// Customer the invoice is addressed to, identified by phone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerRef(String);

impl CustomerRef {
    pub fn parse(value: &str) -> Result<Self, InvoiceError> {
        if value.trim().is_empty() {
            return Err(InvoiceError::EmptyCustomerPhone);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CustomerRef {
    type Error = InvoiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CustomerRef> for String {
    fn from(value: CustomerRef) -> Self {
        value.0
    }
}

/// Declares a decimal newtype with a validating constructor.
macro_rules! money_value {
    ($(#[$meta:meta])* $name:ident, $valid:expr, $error:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "Decimal", into = "Decimal")]
        pub struct $name(Decimal);

        impl $name {
            pub fn new(value: Decimal) -> Result<Self, InvoiceError> {
                let valid: fn(Decimal) -> bool = $valid;
                if valid(value) { Ok(Self(value)) } else { Err($error) }
            }

            pub fn value(&self) -> Decimal {
                self.0
            }
        }

        impl TryFrom<Decimal> for $name {
            type Error = InvoiceError;

            fn try_from(value: Decimal) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for Decimal {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

money_value!(
    /// Order amount being invoiced, strictly positive.
    InvoiceAmount,
    |value| value > Decimal::ZERO,
    InvoiceError::InvalidAmount
);

money_value!(
    /// Tax on the invoice, zero or more.
    TaxAmount,
    |value| value >= Decimal::ZERO,
    InvoiceError::NegativeTax
);

money_value!(
    /// Amount plus tax, strictly positive.
    TotalAmount,
    |value| value > Decimal::ZERO,
    InvoiceError::InvalidTotal
);

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_references_reject_blank_values() {
        assert_eq!(RestaurantRef::parse(" "), Err(InvoiceError::EmptyRestaurantId));
        assert_eq!(CustomerRef::parse(""), Err(InvoiceError::EmptyCustomerPhone));
        assert_eq!(RestaurantRef::parse("REST-0001").unwrap().as_str(), "REST-0001");
    }

    #[test]
    fn test_amount_bounds() {
        assert_eq!(InvoiceAmount::new(Decimal::ZERO), Err(InvoiceError::InvalidAmount));
        assert_eq!(TaxAmount::new(Decimal::ZERO).unwrap().value(), Decimal::ZERO);
        assert_eq!(TaxAmount::new(dec!(-0.01)), Err(InvoiceError::NegativeTax));
        assert_eq!(TotalAmount::new(dec!(-1)), Err(InvoiceError::InvalidTotal));
        assert_eq!(TotalAmount::new(dec!(110.00)).unwrap().value(), dec!(110.00));
    }
}
