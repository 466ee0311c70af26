//! HTTP entry point and process wiring for the order saga.
//!
//! `POST /orders` runs order placement synchronously. Billing and delivery
//! run as receive loops in the same process, fed by the broker.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use domain::billing::Invoice;
use domain::delivery::Delivery;
use domain::order::Order;
use domain::{DeliveryDispatch, InvoiceIssuance, OrderPlacement};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{ConsumerConfig, EventSender, IdempotentConsumer, Workflow};
use sqlx::PgPool;
use store::{
    DedupLedger, InMemoryLedger, InMemoryRepository, PostgresLedger, PostgresRepository,
    Repository,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::AppState;

/// Billing service consumer as wired by the binary.
pub type BillingConsumer = IdempotentConsumer<
    InvoiceIssuance,
    Arc<dyn Repository<Invoice>>,
    Arc<dyn EventSender>,
    Arc<dyn DedupLedger>,
>;

/// Delivery service consumer as wired by the binary.
pub type DeliveryConsumer = IdempotentConsumer<
    DeliveryDispatch,
    Arc<dyn Repository<Delivery>>,
    Arc<dyn EventSender>,
    Arc<dyn DedupLedger>,
>;

/// Storage for the three services.
#[derive(Clone)]
pub struct Backends {
    pub name: &'static str,
    pub orders: Arc<dyn Repository<Order>>,
    pub invoices: Arc<dyn Repository<Invoice>>,
    pub deliveries: Arc<dyn Repository<Delivery>>,
    pub billing_ledger: Arc<dyn DedupLedger>,
    pub delivery_ledger: Arc<dyn DedupLedger>,
}

impl Backends {
    /// In-memory repositories and ledgers.
    pub fn in_memory() -> Self {
        Self {
            name: "memory",
            orders: Arc::new(InMemoryRepository::<Order>::new()),
            invoices: Arc::new(InMemoryRepository::<Invoice>::new()),
            deliveries: Arc::new(InMemoryRepository::<Delivery>::new()),
            billing_ledger: Arc::new(InMemoryLedger::new()),
            delivery_ledger: Arc::new(InMemoryLedger::new()),
        }
    }

    /// PostgreSQL repositories and ledgers sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            name: "postgres",
            orders: Arc::new(PostgresRepository::<Order>::new(pool.clone())),
            invoices: Arc::new(PostgresRepository::<Invoice>::new(pool.clone())),
            deliveries: Arc::new(PostgresRepository::<Delivery>::new(pool.clone())),
            billing_ledger: Arc::new(PostgresLedger::new(pool.clone())),
            delivery_ledger: Arc::new(PostgresLedger::new(pool)),
        }
    }
}

/// Everything the binary runs: HTTP state plus the two consumers.
pub struct Services {
    pub state: Arc<AppState>,
    pub billing: Arc<BillingConsumer>,
    pub delivery: Arc<DeliveryConsumer>,
}

/// Wires the three workflows to their storage and the shared sender.
pub fn build_services(
    config: &Config,
    backends: Backends,
    sender: Arc<dyn EventSender>,
) -> Services {
    let orders = Workflow::new(OrderPlacement::default(), backends.orders, sender.clone())
        .with_topic(&config.order_topic);

    let billing = IdempotentConsumer::new(
        Workflow::new(
            InvoiceIssuance::default(),
            backends.invoices,
            sender.clone(),
        )
        .with_topic(&config.billing_topic),
        backends.billing_ledger,
        ConsumerConfig::new("billing").with_max_delivery_attempts(config.max_delivery_attempts),
    );

    let delivery = IdempotentConsumer::new(
        Workflow::new(DeliveryDispatch::default(), backends.deliveries, sender)
            .with_topic(&config.delivery_topic),
        backends.delivery_ledger,
        ConsumerConfig::new("delivery").with_max_delivery_attempts(config.max_delivery_attempts),
    );

    Services {
        state: Arc::new(AppState {
            orders,
            storage: backends.name,
        }),
        billing: Arc::new(billing),
        delivery: Arc::new(delivery),
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::health::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            get(routes::orders::list).post(routes::orders::create),
        )
        .route("/orders/{id}", get(routes::orders::get))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
