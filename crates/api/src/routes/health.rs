//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub directory: &'static str,
    pub inventory: &'static str,
}

fn up_down(available: bool) -> &'static str {
    if available { "UP" } else { "DOWN" }
}

/// GET /health: reports this service, its order store and the remote services
/// it depends on.
pub async fn check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let upstream = state.orders.upstream_status().await;
    let status = if upstream.all_available() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: up_down(upstream.all_available()),
            database: up_down(upstream.database),
            directory: up_down(upstream.directory),
            inventory: up_down(upstream.inventory),
        }),
    )
}
