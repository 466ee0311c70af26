use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::MessageId;
use tokio::sync::{Mutex, MutexGuard, Notify, RwLock};

use super::{Delivery, DeliverySettlement, DeliveryStream, MessageBroker};
use crate::error::{BrokerError, Result};

/// A message that was moved to a subscription's dead-letter queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub message_id: MessageId,
    pub body: Vec<u8>,
    pub delivery_count: u32,
    pub reason_code: String,
    pub description: String,
}

#[derive(Debug, Clone)]
struct QueuedMessage {
    id: MessageId,
    body: Vec<u8>,
    delivery_count: u32,
}

#[derive(Debug, Default)]
struct SubscriptionState {
    queue: VecDeque<QueuedMessage>,
    in_flight: HashMap<MessageId, QueuedMessage>,
    dead_letters: Vec<DeadLetter>,
    completed: usize,
    closed: bool,
}

struct SubscriptionQueue {
    name: String,
    state: Mutex<SubscriptionState>,
    notify: Notify,
}

impl SubscriptionQueue {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(SubscriptionState::default()),
            notify: Notify::new(),
        }
    }

    async fn enqueue(&self, message: QueuedMessage) {
        self.state.lock().await.queue.push_back(message);
        self.notify.notify_one();
    }

    /// Waits for the next message. Returns `None` once the subscription is
    /// closed.
    async fn next_delivery(self: &Arc<Self>) -> Option<Delivery> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().await;
                if state.closed {
                    return None;
                }
                if let Some(mut message) = state.queue.pop_front() {
                    message.delivery_count += 1;
                    state.in_flight.insert(message.id.clone(), message.clone());
                    return Some(Delivery::new(
                        message.id,
                        message.body,
                        message.delivery_count,
                        self.clone(),
                    ));
                }
            }
            notified.await;
        }
    }

    /// Removes an in-flight message, keeping the lock for the caller.
    async fn take_in_flight(
        &self,
        message_id: &MessageId,
    ) -> Result<(QueuedMessage, MutexGuard<'_, SubscriptionState>)> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(BrokerError::Closed(self.name.clone()));
        }
        let message = state
            .in_flight
            .remove(message_id)
            .ok_or_else(|| BrokerError::UnknownMessage(message_id.clone()))?;
        Ok((message, state))
    }
}

#[async_trait]
impl DeliverySettlement for SubscriptionQueue {
    async fn complete(&self, message_id: &MessageId) -> Result<()> {
        let (_, mut state) = self.take_in_flight(message_id).await?;
        state.completed += 1;
        Ok(())
    }

    async fn abandon(&self, message_id: &MessageId) -> Result<()> {
        let (message, mut state) = self.take_in_flight(message_id).await?;
        state.queue.push_front(message);
        drop(state);
        self.notify.notify_one();
        Ok(())
    }

    async fn dead_letter(
        &self,
        message_id: &MessageId,
        reason_code: &str,
        description: &str,
    ) -> Result<()> {
        let (message, mut state) = self.take_in_flight(message_id).await?;
        state.dead_letters.push(DeadLetter {
            message_id: message.id,
            body: message.body,
            delivery_count: message.delivery_count,
            reason_code: reason_code.to_string(),
            description: description.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
struct BrokerState {
    /// topic -> subscription name -> queue
    subscriptions: HashMap<String, HashMap<String, Arc<SubscriptionQueue>>>,
    /// topic -> every payload published to it, in order
    published: HashMap<String, Vec<(MessageId, serde_json::Value)>>,
}

/// In-memory broker for testing and single-process runs.
///
/// Messages published to a topic are copied to every subscription that
/// exists at publish time. Abandoned messages go back to the front of their
/// subscription queue.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<RwLock<BrokerState>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryBroker {
    /// Creates a new broker with no topics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent publish fail with [`BrokerError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Creates a subscription so that it receives messages published from
    /// now on. Creating an existing subscription is a no-op.
    pub async fn create_subscription(&self, topic: &str, subscription: &str) {
        self.subscription(topic, subscription).await;
    }

    /// Publishes with a caller-chosen message ID.
    ///
    /// Publishing the same ID twice models a broker redelivering a
    /// duplicate.
    pub async fn publish_with_id(
        &self,
        topic: &str,
        message_id: MessageId,
        payload: serde_json::Value,
    ) -> Result<MessageId> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable(format!(
                "cannot publish to {topic}"
            )));
        }

        let body = serde_json::to_vec(&payload)?;
        let queues: Vec<Arc<SubscriptionQueue>> = {
            let mut state = self.state.write().await;
            state
                .published
                .entry(topic.to_string())
                .or_default()
                .push((message_id.clone(), payload));
            state
                .subscriptions
                .get(topic)
                .map(|subs| subs.values().cloned().collect())
                .unwrap_or_default()
        };

        for queue in &queues {
            queue
                .enqueue(QueuedMessage {
                    id: message_id.clone(),
                    body: body.clone(),
                    delivery_count: 0,
                })
                .await;
        }

        tracing::debug!(topic, %message_id, subscribers = queues.len(), "message published");
        Ok(message_id)
    }

    /// Closes a subscription: open streams end and settlements fail.
    pub async fn close_subscription(&self, topic: &str, subscription: &str) {
        if let Some(queue) = self.existing(topic, subscription).await {
            queue.state.lock().await.closed = true;
            queue.notify.notify_waiters();
        }
    }

    /// Returns every payload published to a topic, in order.
    pub async fn published(&self, topic: &str) -> Vec<serde_json::Value> {
        self.state
            .read()
            .await
            .published
            .get(topic)
            .map(|messages| messages.iter().map(|(_, p)| p.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of messages waiting in a subscription (not in flight).
    pub async fn pending_count(&self, topic: &str, subscription: &str) -> usize {
        match self.existing(topic, subscription).await {
            Some(queue) => queue.state.lock().await.queue.len(),
            None => 0,
        }
    }

    /// Number of messages delivered but not yet settled.
    pub async fn in_flight_count(&self, topic: &str, subscription: &str) -> usize {
        match self.existing(topic, subscription).await {
            Some(queue) => queue.state.lock().await.in_flight.len(),
            None => 0,
        }
    }

    /// Number of messages completed on a subscription.
    pub async fn completed_count(&self, topic: &str, subscription: &str) -> usize {
        match self.existing(topic, subscription).await {
            Some(queue) => queue.state.lock().await.completed,
            None => 0,
        }
    }

    /// Messages dead-lettered on a subscription.
    pub async fn dead_letters(&self, topic: &str, subscription: &str) -> Vec<DeadLetter> {
        match self.existing(topic, subscription).await {
            Some(queue) => queue.state.lock().await.dead_letters.clone(),
            None => Vec::new(),
        }
    }

    async fn existing(&self, topic: &str, subscription: &str) -> Option<Arc<SubscriptionQueue>> {
        self.state
            .read()
            .await
            .subscriptions
            .get(topic)
            .and_then(|subs| subs.get(subscription))
            .cloned()
    }

    async fn subscription(&self, topic: &str, subscription: &str) -> Arc<SubscriptionQueue> {
        if let Some(queue) = self.existing(topic, subscription).await {
            return queue;
        }

        let mut state = self.state.write().await;
        state
            .subscriptions
            .entry(topic.to_string())
            .or_default()
            .entry(subscription.to_string())
            .or_insert_with(|| Arc::new(SubscriptionQueue::new(subscription)))
            .clone()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<MessageId> {
        self.publish_with_id(topic, MessageId::generate(), payload)
            .await
    }

    async fn subscribe(&self, topic: &str, subscription: &str) -> Result<DeliveryStream> {
        let queue = self.subscription(topic, subscription).await;
        tracing::info!(topic, subscription, "subscription opened");

        let stream = futures_util::stream::unfold(queue, |queue| async move {
            let delivery = queue.next_delivery().await?;
            Some((Ok(delivery), queue))
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscription() {
        let broker = InMemoryBroker::new();
        broker.create_subscription("orders", "billing").await;
        broker.create_subscription("orders", "audit").await;

        broker.publish("orders", json!({"n": 1})).await.unwrap();

        assert_eq!(broker.pending_count("orders", "billing").await, 1);
        assert_eq!(broker.pending_count("orders", "audit").await, 1);
        assert_eq!(broker.published("orders").await, vec![json!({"n": 1})]);
    }

    #[tokio::test]
    async fn test_messages_before_subscription_are_not_delivered() {
        let broker = InMemoryBroker::new();
        broker.publish("orders", json!({"n": 1})).await.unwrap();
        broker.create_subscription("orders", "billing").await;

        assert_eq!(broker.pending_count("orders", "billing").await, 0);
        assert_eq!(broker.published("orders").await.len(), 1);
    }

    #[tokio::test]
    async fn test_complete_removes_message() {
        let broker = InMemoryBroker::new();
        let mut stream = broker.subscribe("orders", "billing").await.unwrap();
        let id = broker.publish("orders", json!({"n": 1})).await.unwrap();

        let delivery = stream.next().await.unwrap().unwrap();
        assert_eq!(delivery.message_id, id);
        assert_eq!(delivery.delivery_count, 1);
        assert_eq!(delivery.body, br#"{"n":1}"#.to_vec());

        assert_eq!(broker.in_flight_count("orders", "billing").await, 1);
        delivery.complete().await.unwrap();
        assert_eq!(broker.completed_count("orders", "billing").await, 1);
        assert_eq!(broker.pending_count("orders", "billing").await, 0);
        assert_eq!(broker.in_flight_count("orders", "billing").await, 0);
    }

    #[tokio::test]
    async fn test_abandon_redelivers_with_higher_count() {
        let broker = InMemoryBroker::new();
        let mut stream = broker.subscribe("orders", "billing").await.unwrap();
        broker.publish("orders", json!({"n": 1})).await.unwrap();
        broker.publish("orders", json!({"n": 2})).await.unwrap();

        let first = stream.next().await.unwrap().unwrap();
        let id = first.message_id.clone();
        first.abandon().await.unwrap();

        let again = stream.next().await.unwrap().unwrap();
        assert_eq!(again.message_id, id);
        assert_eq!(again.delivery_count, 2);
    }

    #[tokio::test]
    async fn test_dead_letter_keeps_reason() {
        let broker = InMemoryBroker::new();
        let mut stream = broker.subscribe("orders", "billing").await.unwrap();
        broker.publish("orders", json!({"n": 1})).await.unwrap();

        let delivery = stream.next().await.unwrap().unwrap();
        delivery
            .dead_letter("DeserializationFailed", "bad json")
            .await
            .unwrap();

        let dead = broker.dead_letters("orders", "billing").await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].reason_code, "DeserializationFailed");
        assert_eq!(dead[0].description, "bad json");
        assert_eq!(dead[0].delivery_count, 1);
    }

    #[tokio::test]
    async fn test_unavailable_broker_rejects_publish() {
        let broker = InMemoryBroker::new();
        broker.set_unavailable(true);

        let err = broker.publish("orders", json!({})).await.unwrap_err();
        assert!(err.is_transient());
        assert!(broker.published("orders").await.is_empty());
    }

    #[tokio::test]
    async fn test_waiting_stream_wakes_on_publish() {
        let broker = InMemoryBroker::new();
        let mut stream = broker.subscribe("orders", "billing").await.unwrap();

        let publisher = broker.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            publisher.publish("orders", json!({"late": true})).await.unwrap();
        });

        let delivery = stream.next().await.unwrap().unwrap();
        assert_eq!(delivery.delivery_count, 1);
    }

    #[tokio::test]
    async fn test_close_ends_stream_and_rejects_settlement() {
        let broker = InMemoryBroker::new();
        let mut stream = broker.subscribe("orders", "billing").await.unwrap();
        broker.publish("orders", json!({})).await.unwrap();
        let delivery = stream.next().await.unwrap().unwrap();

        broker.close_subscription("orders", "billing").await;

        assert!(matches!(
            delivery.complete().await,
            Err(BrokerError::Closed(name)) if name == "billing"
        ));
        assert!(stream.next().await.is_none());
    }
}
