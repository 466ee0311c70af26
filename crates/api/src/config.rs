//! Application configuration loaded from environment variables.

use saga::DEFAULT_MAX_DELIVERY_ATTEMPTS;

/// Process configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default: `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `ORDER_TOPIC`, `BILLING_TOPIC`, `DELIVERY_TOPIC`: outbound topics
/// - `BILLING_SUBSCRIPTION`, `DELIVERY_SUBSCRIPTION`: inbound subscriptions
/// - `MAX_DELIVERY_ATTEMPTS`: deliveries before an unclassified fault is
///   dead-lettered (default: `3`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory storage when unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub order_topic: String,
    pub billing_topic: String,
    pub delivery_topic: String,
    pub billing_subscription: String,
    pub delivery_subscription: String,
    pub max_delivery_attempts: u32,
    pub database_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);

        Self {
            host: text("HOST", defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: text("RUST_LOG", defaults.log_level),
            order_topic: text("ORDER_TOPIC", defaults.order_topic),
            billing_topic: text("BILLING_TOPIC", defaults.billing_topic),
            delivery_topic: text("DELIVERY_TOPIC", defaults.delivery_topic),
            billing_subscription: text("BILLING_SUBSCRIPTION", defaults.billing_subscription),
            delivery_subscription: text("DELIVERY_SUBSCRIPTION", defaults.delivery_subscription),
            max_delivery_attempts: lookup("MAX_DELIVERY_ATTEMPTS")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_delivery_attempts),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            order_topic: "order-topic".to_string(),
            billing_topic: "billing-topic".to_string(),
            delivery_topic: "delivery-topic".to_string(),
            billing_subscription: "billing-subscription".to_string(),
            delivery_subscription: "delivery-subscription".to_string(),
            max_delivery_attempts: DEFAULT_MAX_DELIVERY_ATTEMPTS,
            database_url: None,
        }
    }
}
