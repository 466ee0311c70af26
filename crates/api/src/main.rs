//! Process entry point: HTTP server plus the billing and delivery consumers.

use std::sync::Arc;

use api::Backends;
use api::config::Config;
use saga::{BrokerEventSender, InMemoryBroker, MessageBroker};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn connect_backends(config: &Config) -> Backends {
    let Some(url) = config.database_url.as_deref() else {
        return Backends::in_memory();
    };

    let pool = sqlx::PgPool::connect(url)
        .await
        .expect("failed to connect to PostgreSQL");
    store::run_migrations(&pool)
        .await
        .expect("failed to run migrations");
    Backends::postgres(pool)
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Broker, storage and services
    let broker = InMemoryBroker::new();
    let backends = connect_backends(&config).await;
    tracing::info!(storage = backends.name, "storage ready");

    let sender = Arc::new(BrokerEventSender::new(broker.clone()));
    let services = api::build_services(&config, backends, sender);

    // 4. Subscriptions exist before the first order can be published
    let billing_stream = broker
        .subscribe(&config.order_topic, &config.billing_subscription)
        .await
        .expect("failed to subscribe billing");
    let delivery_stream = broker
        .subscribe(&config.billing_topic, &config.delivery_subscription)
        .await
        .expect("failed to subscribe delivery");

    // 5. Receive loops
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let billing = {
        let consumer = services.billing.clone();
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { consumer.run(billing_stream, rx).await })
    };
    let delivery = {
        let consumer = services.delivery.clone();
        let rx = shutdown_rx;
        tokio::spawn(async move { consumer.run(delivery_stream, rx).await })
    };

    // 6. Start server
    let app = api::create_app(services.state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await
        .expect("server error");

    // 7. Let in-flight messages settle
    for (name, task) in [("billing", billing), ("delivery", delivery)] {
        if let Err(e) = task.await {
            tracing::error!(consumer = name, error = %e, "consumer task failed");
        }
    }

    tracing::info!("server shut down gracefully");
}
