//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::routes::orders::AppState;
use clients::{DirectoryClient, HttpDirectoryClient, HttpInventoryClient, InventoryClient};
use order_store::{InMemoryOrderRepository, OrderRepository, PostgresOrderRepository};
use ordering::{OrderMetrics, PrometheusOrderMetrics};
use tokio::signal;
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

/// Opens the configured order store, running migrations on PostgreSQL.
async fn open_repository(config: &Config) -> Arc<dyn OrderRepository> {
    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let repository = PostgresOrderRepository::new(pool);
            repository
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL order store");
            Arc::new(repository)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory");
            Arc::new(InMemoryOrderRepository::new())
        }
    }
}

/// Keeps the `orders_amount_today` gauge current.
fn spawn_amount_refresh(state: Arc<AppState>, period: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = state.orders.refresh_amount_today().await {
                tracing::warn!(error = %e, "failed to refresh daily order amount");
            }
        }
    });
}

#[tokio::main]
async fn main() {
    // 1. Load configuration
    let config = Config::from_env().expect("invalid configuration");

    // 2. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 3. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 4. Open the store and the remote clients
    let repository = open_repository(&config).await;
    let directory: Arc<dyn DirectoryClient> = Arc::new(
        HttpDirectoryClient::new(&config.directory_base_url, config.remote_timeout)
            .expect("failed to build directory client"),
    );
    let inventory: Arc<dyn InventoryClient> = Arc::new(
        HttpInventoryClient::new(&config.inventory_base_url, config.remote_timeout)
            .expect("failed to build inventory client"),
    );
    let metrics: Arc<dyn OrderMetrics> = Arc::new(PrometheusOrderMetrics);

    let state = api::create_state(repository, directory, inventory, metrics, config.ordering());
    spawn_amount_refresh(state.clone(), config.metrics_refresh);

    // 5. Build the application
    let app = api::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(
        %addr,
        directory = %config.directory_base_url,
        inventory = %config.inventory_base_url,
        compensation = ?config.compensation,
        "starting API server"
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
