//! Order endpoints.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequestParts, Path, State};
use axum::http::header::{AUTHORIZATION, LOCATION};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clients::{DirectoryClient, InventoryClient};
use common::{Credential, OrderId, UserId};
use domain::OrderView;
use order_store::OrderRepository;
use ordering::{CreateOrderRequest, OrderMetrics, OrderService, UpdateStatusRequest};

use crate::error::ApiError;

/// The order service as wired by the binary: every collaborator is chosen at
/// startup, so they are held behind trait objects.
pub type AppOrderService = OrderService<
    Arc<dyn OrderRepository>,
    Arc<dyn DirectoryClient>,
    Arc<dyn InventoryClient>,
    Arc<dyn OrderMetrics>,
>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orders: AppOrderService,
}

/// The inbound `Authorization` header, to be forwarded unchanged.
#[derive(Debug, Clone)]
pub struct ForwardedCredential(pub Option<Credential>);

impl<S: Send + Sync> FromRequestParts<S> for ForwardedCredential {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let credential = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(Credential::from_header);
        Ok(Self(credential))
    }
}

/// POST /api/v1/orders: place an order.
#[tracing::instrument(skip(state, credential, body))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    ForwardedCredential(credential): ForwardedCredential,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let order = state
        .orders
        .create_order(request, credential.as_ref())
        .await?;

    let view = order.to_view();
    let location = format!("/api/v1/orders/{}", view.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(view)).into_response())
}

/// GET /api/v1/orders: list every order.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(state.orders.list_orders().await?))
}

/// GET /api/v1/orders/{id}: load one order.
#[tracing::instrument(skip(state, path))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    path: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<OrderView>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.orders.get_order(id).await?))
}

/// GET /api/v1/orders/user/{user_id}: orders owned by a user.
#[tracing::instrument(skip(state, path))]
pub async fn by_user(
    State(state): State<Arc<AppState>>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let Path(user_id) = path?;
    Ok(Json(state.orders.orders_for_user(user_id).await?))
}

/// GET /api/v1/orders/status/{status}: orders in a status.
#[tracing::instrument(skip(state))]
pub async fn by_status(
    State(state): State<Arc<AppState>>,
    Path(status): Path<String>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(state.orders.orders_with_status(&status).await?))
}

/// PATCH /api/v1/orders/{id}/status: move an order to another status.
#[tracing::instrument(skip(state, path, body))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    path: Result<Path<OrderId>, PathRejection>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<OrderView>, ApiError> {
    let Path(id) = path?;
    let Json(request) = body?;
    Ok(Json(state.orders.update_status(id, &request.status).await?))
}

/// DELETE /api/v1/orders/{id}: delete a non-terminal order.
#[tracing::instrument(skip(state, path))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    path: Result<Path<OrderId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    state.orders.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
