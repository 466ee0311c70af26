//! Integration tests for the order → billing → delivery choreography.
//!
//! The three services share one in-memory broker. Billing and delivery run
//! their receive loops on spawned tasks, exactly as the binary does.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use common::MessageId;
use domain::billing::Invoice;
use domain::delivery::Delivery as DeliveryEntity;
use domain::order::{Order, OrderEvent, PlaceOrderCommand};
use domain::{DeliveryDispatch, FixedClock, FixedRandom, InvoiceIssuance, OrderPlacement};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use saga::{
    BrokerEventSender, ConsumerConfig, IdempotentConsumer, InMemoryBroker, MessageBroker, Workflow,
};
use serde_json::json;
use store::{DedupLedger, InMemoryLedger, InMemoryRepository, Repository};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const ORDER_TOPIC: &str = "order-topic";
const BILLING_TOPIC: &str = "billing-topic";
const DELIVERY_TOPIC: &str = "delivery-topic";
const BILLING_SUBSCRIPTION: &str = "billing-subscription";
const DELIVERY_SUBSCRIPTION: &str = "delivery-subscription";

type Sender = BrokerEventSender<InMemoryBroker>;

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
}

/// Polls `check` until it returns true, failing the test after a few
/// seconds.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

struct TestHarness {
    broker: InMemoryBroker,
    orders: Workflow<OrderPlacement, InMemoryRepository<Order>, Sender>,
    invoices: InMemoryRepository<Invoice>,
    deliveries: InMemoryRepository<DeliveryEntity>,
    billing_ledger: InMemoryLedger,
    delivery_ledger: InMemoryLedger,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl TestHarness {
    async fn start() -> Self {
        let broker = InMemoryBroker::new();
        let random = Arc::new(FixedRandom(5000));
        let clock = Arc::new(FixedClock(noon()));

        let orders = Workflow::new(
            OrderPlacement::new(random.clone(), clock.clone()),
            InMemoryRepository::new(),
            BrokerEventSender::new(broker.clone()),
        );

        let invoices = InMemoryRepository::new();
        let billing_ledger = InMemoryLedger::new();
        let billing = Arc::new(IdempotentConsumer::new(
            Workflow::new(
                InvoiceIssuance::new(clock.clone()),
                invoices.clone(),
                BrokerEventSender::new(broker.clone()),
            ),
            billing_ledger.clone(),
            ConsumerConfig::new("billing"),
        ));

        let deliveries = InMemoryRepository::new();
        let delivery_ledger = InMemoryLedger::new();
        let delivery = Arc::new(IdempotentConsumer::new(
            Workflow::new(
                DeliveryDispatch::new(random, clock),
                deliveries.clone(),
                BrokerEventSender::new(broker.clone()),
            ),
            delivery_ledger.clone(),
            ConsumerConfig::new("delivery"),
        ));

        let (shutdown, shutdown_rx) = watch::channel(false);

        let billing_stream = broker
            .subscribe(ORDER_TOPIC, BILLING_SUBSCRIPTION)
            .await
            .unwrap();
        let delivery_stream = broker
            .subscribe(BILLING_TOPIC, DELIVERY_SUBSCRIPTION)
            .await
            .unwrap();

        let tasks = vec![
            {
                let rx = shutdown_rx.clone();
                tokio::spawn(async move { billing.run(billing_stream, rx).await })
            },
            {
                let rx = shutdown_rx;
                tokio::spawn(async move { delivery.run(delivery_stream, rx).await })
            },
        ];

        Self {
            broker,
            orders,
            invoices,
            deliveries,
            billing_ledger,
            delivery_ledger,
            shutdown,
            tasks,
        }
    }

    async fn stop(self) {
        self.shutdown.send(true).unwrap();
        for task in self.tasks {
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("consumer did not stop")
                .unwrap();
        }
    }
}

fn place_order(amount: Decimal) -> PlaceOrderCommand {
    PlaceOrderCommand {
        restaurant_id: "REST-0001".into(),
        customer_phone: "(555) 123-4567".into(),
        delivery_address: "12 Main Street, Springfield".into(),
        order_amount: amount,
    }
}

fn order_placed_payload() -> serde_json::Value {
    json!({
        "restaurantId": "REST-0001",
        "customerPhone": "5551234567",
        "deliveryAddress": "12 Main Street, Springfield",
        "orderAmount": "100.00",
        "placedAt": "2025-03-14T12:00:00Z"
    })
}

mod choreography {
    use super::*;

    #[tokio::test]
    async fn placed_order_flows_through_billing_and_delivery() {
        let harness = TestHarness::start().await;

        let event = harness.orders.execute(place_order(dec!(100.00))).await;
        assert!(matches!(event, OrderEvent::Placed(_)));

        let broker = &harness.broker;
        eventually(|| async move { broker.published(DELIVERY_TOPIC).await.len() == 1 }).await;

        let invoice_events = broker.published(BILLING_TOPIC).await;
        assert_eq!(invoice_events.len(), 1);
        assert_eq!(invoice_events[0]["amount"], "100.00");
        assert_eq!(invoice_events[0]["tax"], "10.00");
        assert_eq!(invoice_events[0]["total"], "110.00");

        let delivery_events = broker.published(DELIVERY_TOPIC).await;
        assert_eq!(delivery_events[0]["restaurantId"], "REST-0001");
        assert_eq!(delivery_events[0]["customerPhone"], "(555) 123-4567");
        assert_eq!(delivery_events[0]["driverId"], "DRV-5000");
        assert_eq!(
            delivery_events[0]["route"],
            "Route to: 12 Main Street, Springfield"
        );

        assert_eq!(harness.invoices.len().await, 1);
        assert_eq!(harness.deliveries.len().await, 1);
        assert_eq!(harness.billing_ledger.entry_count().await, 1);
        assert_eq!(harness.delivery_ledger.entry_count().await, 1);

        harness.stop().await;
    }

    #[tokio::test]
    async fn invalid_order_stops_at_the_entry_service() {
        let harness = TestHarness::start().await;

        let event = harness.orders.execute(place_order(dec!(-5.00))).await;

        let reason = event.failure_reason().unwrap();
        assert!(reason.contains("Amount must be greater than 0"));
        assert!(harness.broker.published(ORDER_TOPIC).await.is_empty());
        assert!(harness.orders.repository().is_empty().await);
        assert_eq!(
            harness
                .broker
                .pending_count(ORDER_TOPIC, BILLING_SUBSCRIPTION)
                .await,
            0
        );

        harness.stop().await;
    }

    #[tokio::test]
    async fn placed_orders_are_readable_by_phone() {
        let harness = TestHarness::start().await;

        harness.orders.execute(place_order(dec!(20.00))).await;
        harness.orders.execute(place_order(dec!(30.00))).await;

        let found = harness
            .orders
            .repository()
            .get_by_filter("(555) 123-4567")
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        harness.stop().await;
    }
}

mod idempotence {
    use super::*;

    #[tokio::test]
    async fn duplicate_message_is_processed_once() {
        let harness = TestHarness::start().await;
        let id = MessageId::new("order-msg-1");

        harness
            .broker
            .publish_with_id(ORDER_TOPIC, id.clone(), order_placed_payload())
            .await
            .unwrap();
        harness
            .broker
            .publish_with_id(ORDER_TOPIC, id.clone(), order_placed_payload())
            .await
            .unwrap();

        let broker = &harness.broker;
        eventually(|| async move {
            broker
                .completed_count(ORDER_TOPIC, BILLING_SUBSCRIPTION)
                .await
                == 2
        })
        .await;

        assert_eq!(harness.invoices.len().await, 1);
        assert_eq!(broker.published(BILLING_TOPIC).await.len(), 1);
        assert!(harness.billing_ledger.exists(&id).await.unwrap());

        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn transient_outage_is_retried_until_it_succeeds() {
        let harness = TestHarness::start().await;
        harness.invoices.set_unavailable(true);

        harness
            .broker
            .publish(ORDER_TOPIC, order_placed_payload())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(harness.invoices.is_empty().await);

        harness.invoices.set_unavailable(false);
        let invoices = &harness.invoices;
        eventually(|| async move { invoices.len().await == 1 }).await;

        assert!(
            harness
                .broker
                .dead_letters(ORDER_TOPIC, BILLING_SUBSCRIPTION)
                .await
                .is_empty()
        );

        harness.stop().await;
    }
}

mod dead_letters {
    use super::*;

    #[tokio::test]
    async fn malformed_payload_is_dead_lettered() {
        let harness = TestHarness::start().await;

        harness
            .broker
            .publish(ORDER_TOPIC, json!({"orderAmount": {"nested": true}}))
            .await
            .unwrap();

        let broker = &harness.broker;
        eventually(|| async move {
            !broker
                .dead_letters(ORDER_TOPIC, BILLING_SUBSCRIPTION)
                .await
                .is_empty()
        })
        .await;

        let dead = broker.dead_letters(ORDER_TOPIC, BILLING_SUBSCRIPTION).await;
        assert_eq!(dead[0].reason_code, "DeserializationFailed");
        assert_eq!(harness.billing_ledger.entry_count().await, 0);

        harness.stop().await;
    }

    #[tokio::test]
    async fn invalid_invoice_is_dead_lettered_with_every_reason() {
        let harness = TestHarness::start().await;

        harness
            .broker
            .publish(
                ORDER_TOPIC,
                json!({
                    "restaurantId": "",
                    "customerPhone": "",
                    "deliveryAddress": "12 Main Street, Springfield",
                    "orderAmount": "100.00"
                }),
            )
            .await
            .unwrap();

        let broker = &harness.broker;
        eventually(|| async move {
            !broker
                .dead_letters(ORDER_TOPIC, BILLING_SUBSCRIPTION)
                .await
                .is_empty()
        })
        .await;

        let dead = broker.dead_letters(ORDER_TOPIC, BILLING_SUBSCRIPTION).await;
        assert_eq!(dead[0].reason_code, "ValidationFailed");
        assert!(dead[0].description.contains("Restaurant ID cannot be empty"));
        assert!(dead[0].description.contains("Customer phone cannot be empty"));
        assert!(broker.published(BILLING_TOPIC).await.is_empty());

        harness.stop().await;
    }
}

mod shutdown {
    use async_trait::async_trait;
    use saga::EventSender;
    use tokio::sync::Notify;

    use super::*;

    /// Publishes only after the test releases it, so a delivery can be held
    /// inside `handle`.
    struct GatedSender {
        inner: Sender,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl EventSender for GatedSender {
        async fn send(
            &self,
            topic: &str,
            payload: serde_json::Value,
        ) -> saga::error::Result<MessageId> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.send(topic, payload).await
        }
    }

    #[tokio::test]
    async fn in_flight_message_is_settled_before_stopping() {
        let broker = InMemoryBroker::new();
        let ledger = InMemoryLedger::new();
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let consumer = IdempotentConsumer::new(
            Workflow::new(
                InvoiceIssuance::new(Arc::new(FixedClock(noon()))),
                InMemoryRepository::new(),
                GatedSender {
                    inner: BrokerEventSender::new(broker.clone()),
                    entered: entered.clone(),
                    release: release.clone(),
                },
            ),
            ledger.clone(),
            ConsumerConfig::new("billing"),
        );

        let stream = broker
            .subscribe(ORDER_TOPIC, BILLING_SUBSCRIPTION)
            .await
            .unwrap();
        for _ in 0..2 {
            broker
                .publish(ORDER_TOPIC, order_placed_payload())
                .await
                .unwrap();
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move { consumer.run(stream, shutdown_rx).await });

        tokio::time::timeout(Duration::from_secs(5), entered.notified())
            .await
            .expect("first message never reached the sender");
        shutdown.send(true).unwrap();
        release.notify_one();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("consumer did not stop")
            .unwrap();

        assert_eq!(broker.completed_count(ORDER_TOPIC, BILLING_SUBSCRIPTION).await, 1);
        assert_eq!(broker.in_flight_count(ORDER_TOPIC, BILLING_SUBSCRIPTION).await, 0);
        assert_eq!(broker.pending_count(ORDER_TOPIC, BILLING_SUBSCRIPTION).await, 1);
        assert_eq!(broker.published(BILLING_TOPIC).await.len(), 1);
        assert_eq!(ledger.entry_count().await, 1);
    }

    #[tokio::test]
    async fn consumers_stop_when_signalled() {
        let harness = TestHarness::start().await;
        harness.stop().await;
    }

    #[tokio::test]
    async fn messages_after_shutdown_stay_queued() {
        let harness = TestHarness::start().await;
        let broker = harness.broker.clone();
        harness.stop().await;

        broker
            .publish(ORDER_TOPIC, order_placed_payload())
            .await
            .unwrap();

        assert_eq!(
            broker
                .pending_count(ORDER_TOPIC, BILLING_SUBSCRIPTION)
                .await,
            1
        );
    }
}
