//! Message broker contract.
//!
//! A broker routes published payloads on a topic to every subscription of
//! that topic. Each subscriber receives [`Delivery`] values and must settle
//! every one of them exactly once: complete, abandon (redeliver) or
//! dead-letter.

mod memory;

pub use memory::{DeadLetter, InMemoryBroker};

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use common::MessageId;
use futures_core::Stream;

use crate::error::Result;

/// A stream of deliveries for one subscription.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<Delivery>> + Send>>;

/// Publish/subscribe access to a message broker.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publishes a JSON payload to a topic and returns its message ID.
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<MessageId>;

    /// Opens a delivery stream for a named subscription of a topic.
    async fn subscribe(&self, topic: &str, subscription: &str) -> Result<DeliveryStream>;
}

/// Broker-side settlement of an in-flight delivery.
#[async_trait]
pub trait DeliverySettlement: Send + Sync {
    /// Removes the message from the subscription.
    async fn complete(&self, message_id: &MessageId) -> Result<()>;

    /// Returns the message to the subscription for redelivery.
    async fn abandon(&self, message_id: &MessageId) -> Result<()>;

    /// Moves the message to the dead-letter queue for inspection.
    async fn dead_letter(
        &self,
        message_id: &MessageId,
        reason_code: &str,
        description: &str,
    ) -> Result<()>;
}

/// A single delivery of a message to a subscriber.
///
/// Settlement methods take `self`, so a delivery can be settled only once.
pub struct Delivery {
    pub message_id: MessageId,
    pub body: Vec<u8>,
    /// How many times this message has been delivered, starting at 1.
    pub delivery_count: u32,
    settlement: Arc<dyn DeliverySettlement>,
}

impl Delivery {
    /// Creates a delivery settled through the given handle.
    pub fn new(
        message_id: MessageId,
        body: Vec<u8>,
        delivery_count: u32,
        settlement: Arc<dyn DeliverySettlement>,
    ) -> Self {
        Self {
            message_id,
            body,
            delivery_count,
            settlement,
        }
    }

    /// Acknowledges the message.
    pub async fn complete(self) -> Result<()> {
        self.settlement.complete(&self.message_id).await
    }

    /// Releases the message for redelivery.
    pub async fn abandon(self) -> Result<()> {
        self.settlement.abandon(&self.message_id).await
    }

    /// Routes the message to the dead-letter queue.
    pub async fn dead_letter(self, reason_code: &str, description: &str) -> Result<()> {
        self.settlement
            .dead_letter(&self.message_id, reason_code, description)
            .await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("message_id", &self.message_id)
            .field("body_len", &self.body.len())
            .field("delivery_count", &self.delivery_count)
            .finish()
    }
}
