//! HTTP API server with observability for the order service.
//!
//! Provides REST endpoints for placing orders and managing their status,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch};
use clients::{DirectoryClient, InventoryClient};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderRepository;
use ordering::{OrderMetrics, OrderService, OrderingConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/api/v1/orders",
            get(routes::orders::list).post(routes::orders::create),
        )
        .route(
            "/api/v1/orders/{id}",
            get(routes::orders::get).delete(routes::orders::delete),
        )
        .route("/api/v1/orders/{id}/status", patch(routes::orders::update_status))
        .route("/api/v1/orders/user/{user_id}", get(routes::orders::by_user))
        .route("/api/v1/orders/status/{status}", get(routes::orders::by_status))
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

/// Wires the order service from its collaborators.
pub fn create_state(
    repository: Arc<dyn OrderRepository>,
    directory: Arc<dyn DirectoryClient>,
    inventory: Arc<dyn InventoryClient>,
    metrics: Arc<dyn OrderMetrics>,
    config: OrderingConfig,
) -> Arc<AppState> {
    Arc::new(AppState {
        orders: OrderService::new(repository, directory, inventory, metrics, config),
    })
}
