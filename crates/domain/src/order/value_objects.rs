//! Value objects for the order domain.
//!
//! Every value object is built through a validating factory; deserializing
//! one runs the same validation.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderError;

static RESTAURANT_ID_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^REST-[0-9]{4}$").expect("restaurant ID pattern is valid"));

static PHONE_FORMATTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-()]").expect("phone formatting pattern is valid"));

static PHONE_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("phone digits pattern is valid"));

/// Minimum length of a delivery address, in characters.
pub const MIN_ADDRESS_LEN: usize = 10;

/// Restaurant identifier in the form `REST-1234`, stored upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RestaurantId(String);

impl RestaurantId {
    /// Validates and normalises a restaurant identifier.
    pub fn parse(value: &str) -> Result<Self, OrderError> {
        if value.trim().is_empty() {
            return Err(OrderError::EmptyRestaurantId);
        }
        if !RESTAURANT_ID_FORMAT.is_match(value) {
            return Err(OrderError::InvalidRestaurantId);
        }
        Ok(Self(value.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RestaurantId {
    type Error = OrderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RestaurantId> for String {
    fn from(id: RestaurantId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RestaurantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Customer phone number: ten digits once spaces, dashes and parentheses
/// are removed. The value is kept as entered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerPhone(String);

impl CustomerPhone {
    pub fn parse(value: &str) -> Result<Self, OrderError> {
        if value.trim().is_empty() {
            return Err(OrderError::EmptyPhone);
        }
        let digits = PHONE_FORMATTING.replace_all(value, "");
        if !PHONE_DIGITS.is_match(&digits) {
            return Err(OrderError::InvalidPhone);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CustomerPhone {
    type Error = OrderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CustomerPhone> for String {
    fn from(phone: CustomerPhone) -> Self {
        phone.0
    }
}

impl std::fmt::Display for CustomerPhone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Street address the order is delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeliveryAddress(String);

impl DeliveryAddress {
    pub fn parse(value: &str) -> Result<Self, OrderError> {
        if value.trim().is_empty() {
            return Err(OrderError::EmptyAddress);
        }
        if value.chars().count() < MIN_ADDRESS_LEN {
            return Err(OrderError::AddressTooShort);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DeliveryAddress {
    type Error = OrderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeliveryAddress> for String {
    fn from(address: DeliveryAddress) -> Self {
        address.0
    }
}

/// Order total, strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct OrderAmount(Decimal);

impl OrderAmount {
    pub fn new(value: Decimal) -> Result<Self, OrderError> {
        if value <= Decimal::ZERO {
            return Err(OrderError::InvalidAmount);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for OrderAmount {
    type Error = OrderError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderAmount> for Decimal {
    fn from(amount: OrderAmount) -> Self {
        amount.0
    }
}
