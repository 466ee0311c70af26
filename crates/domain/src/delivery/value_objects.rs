//! Value objects for the delivery domain.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::DeliveryError;
use crate::random::RandomSource;

static DRIVER_ID_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^DRV-[0-9]{4}$").expect("driver ID pattern is valid"));

/// Minimum length of a destination address, in characters.
pub const MIN_DESTINATION_LEN: usize = 10;

/// Range of generated driver numbers.
const DRIVER_NUMBERS: (u32, u32) = (1000, 9998);

/// The invoice a delivery fulfils.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceReference {
    pub restaurant_id: String,
    pub customer_phone: String,
}

impl InvoiceReference {
    pub fn restaurant_id(value: &str) -> Result<String, DeliveryError> {
        non_blank(value, DeliveryError::EmptyRestaurantId)
    }

    pub fn customer_phone(value: &str) -> Result<String, DeliveryError> {
        non_blank(value, DeliveryError::EmptyCustomerPhone)
    }
}

impl std::fmt::Display for InvoiceReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.restaurant_id, self.customer_phone)
    }
}

fn non_blank(value: &str, error: DeliveryError) -> Result<String, DeliveryError> {
    if value.trim().is_empty() {
        Err(error)
    } else {
        Ok(value.to_string())
    }
}

/// Address the driver heads to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeliveryDestination(String);

impl DeliveryDestination {
    pub fn parse(value: &str) -> Result<Self, DeliveryError> {
        if value.trim().is_empty() {
            return Err(DeliveryError::EmptyDestination);
        }
        if value.chars().count() < MIN_DESTINATION_LEN {
            return Err(DeliveryError::DestinationTooShort);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DeliveryDestination {
    type Error = DeliveryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeliveryDestination> for String {
    fn from(value: DeliveryDestination) -> Self {
        value.0
    }
}

/// Invoice total being delivered, strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct InvoiceTotal(Decimal);

impl InvoiceTotal {
    pub fn new(value: Decimal) -> Result<Self, DeliveryError> {
        if value <= Decimal::ZERO {
            return Err(DeliveryError::InvalidTotal);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for InvoiceTotal {
    type Error = DeliveryError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InvoiceTotal> for Decimal {
    fn from(value: InvoiceTotal) -> Self {
        value.0
    }
}

/// Driver identifier in the form `DRV-1234`, stored upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DriverId(String);

impl DriverId {
    pub fn parse(value: &str) -> Result<Self, DeliveryError> {
        if !DRIVER_ID_FORMAT.is_match(value.trim()) {
            return Err(DeliveryError::InvalidDriverId);
        }
        Ok(Self(value.trim().to_uppercase()))
    }

    /// Picks a driver number from the injected source.
    pub fn random(random: &dyn RandomSource) -> Self {
        let (low, high) = DRIVER_NUMBERS;
        Self(format!("DRV-{}", random.next_in_range(low, high)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DriverId {
    type Error = DeliveryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DriverId> for String {
    fn from(value: DriverId) -> Self {
        value.0
    }
}

/// Route description handed to the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeliveryRoute(String);

impl DeliveryRoute {
    pub fn parse(value: &str) -> Result<Self, DeliveryError> {
        if value.trim().is_empty() {
            return Err(DeliveryError::EmptyRoute);
        }
        Ok(Self(value.to_string()))
    }

    /// Direct route to the destination.
    pub fn direct_to(destination: &DeliveryDestination) -> Self {
        Self(format!("Route to: {}", destination.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DeliveryRoute {
    type Error = DeliveryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeliveryRoute> for String {
    fn from(value: DeliveryRoute) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::random::FixedRandom;

    #[test]
    fn test_destination_rules() {
        assert_eq!(DeliveryDestination::parse(""), Err(DeliveryError::EmptyDestination));
        assert_eq!(
            DeliveryDestination::parse("Elm St"),
            Err(DeliveryError::DestinationTooShort)
        );
        assert!(DeliveryDestination::parse("42 Elm Street").is_ok());
    }

    #[test]
    fn test_driver_id_format() {
        assert_eq!(DriverId::parse("drv-0007").unwrap().as_str(), "DRV-0007");
        assert_eq!(DriverId::parse("DRV-7"), Err(DeliveryError::InvalidDriverId));
        assert_eq!(DriverId::parse(""), Err(DeliveryError::InvalidDriverId));
    }

    #[test]
    fn test_random_driver_is_in_range_and_valid() {
        assert_eq!(DriverId::random(&FixedRandom(0)).as_str(), "DRV-1000");
        assert_eq!(DriverId::random(&FixedRandom(u32::MAX)).as_str(), "DRV-9998");

        let driver = DriverId::random(&FixedRandom(4321));
        assert!(DriverId::parse(driver.as_str()).is_ok());
    }

    #[test]
    fn test_route_and_total() {
        let destination = DeliveryDestination::parse("42 Elm Street").unwrap();
        assert_eq!(DeliveryRoute::direct_to(&destination).as_str(), "Route to: 42 Elm Street");
        assert_eq!(DeliveryRoute::parse(" "), Err(DeliveryError::EmptyRoute));
        assert_eq!(InvoiceTotal::new(dec!(0)), Err(DeliveryError::InvalidTotal));
    }
}
