//! Outbound publishing used by workflows.

use std::sync::Arc;

use async_trait::async_trait;
use common::MessageId;

use crate::broker::MessageBroker;
use crate::error::Result;

/// Publishes a workflow's success event to a topic.
///
/// The publish client is reused across messages and holds no per-call state.
#[async_trait]
pub trait EventSender: Send + Sync {
    async fn send(&self, topic: &str, payload: serde_json::Value) -> Result<MessageId>;
}

/// [`EventSender`] backed by a [`MessageBroker`].
#[derive(Clone)]
pub struct BrokerEventSender<B> {
    broker: B,
}

impl<B: MessageBroker> BrokerEventSender<B> {
    pub fn new(broker: B) -> Self {
        Self { broker }
    }

    /// Gets a reference to the underlying broker.
    pub fn broker(&self) -> &B {
        &self.broker
    }
}

#[async_trait]
impl<B: MessageBroker> EventSender for BrokerEventSender<B> {
    #[tracing::instrument(skip(self, payload))]
    async fn send(&self, topic: &str, payload: serde_json::Value) -> Result<MessageId> {
        let message_id = self.broker.publish(topic, payload).await?;
        tracing::info!(%message_id, "event sent");
        Ok(message_id)
    }
}

#[async_trait]
impl<T: EventSender + ?Sized> EventSender for Arc<T> {
    async fn send(&self, topic: &str, payload: serde_json::Value) -> Result<MessageId> {
        (**self).send(topic, payload).await
    }
}
