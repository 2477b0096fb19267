//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ordering::OrderingError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The request path or body could not be read.
    BadRequest(String),
    /// Ordering operation error.
    Ordering(OrderingError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ordering(err) => ordering_status(err),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Ordering(err) => err.code(),
        }
    }
}

fn ordering_status(err: &OrderingError) -> StatusCode {
    match err {
        OrderingError::ValidationFailed(_) | OrderingError::InvalidStatus(_) => {
            StatusCode::BAD_REQUEST
        }
        OrderingError::UserNotFound(_)
        | OrderingError::ProductNotFound(_)
        | OrderingError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        OrderingError::InsufficientStock { .. } | OrderingError::OrderNotModifiable(_) => {
            StatusCode::CONFLICT
        }
        OrderingError::UpstreamUnauthorized(_) => StatusCode::UNAUTHORIZED,
        OrderingError::UpstreamForbidden(_) => StatusCode::FORBIDDEN,
        OrderingError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        OrderingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Ordering(err) => err.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": self.code(), "message": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<OrderingError> for ApiError {
    fn from(err: OrderingError) -> Self {
        ApiError::Ordering(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clients::RemoteService;
    use common::{ProductId, UserId};
    use domain::OrderStatus;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                OrderingError::UserNotFound(UserId::new(1)),
                StatusCode::NOT_FOUND,
            ),
            (
                OrderingError::InsufficientStock {
                    product_id: ProductId::new(1),
                    requested: 2,
                    available: Some(1),
                },
                StatusCode::CONFLICT,
            ),
            (
                OrderingError::OrderNotModifiable(OrderStatus::Delivered),
                StatusCode::CONFLICT,
            ),
            (
                OrderingError::InvalidStatus("X".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                OrderingError::UpstreamUnauthorized(RemoteService::Inventory),
                StatusCode::UNAUTHORIZED,
            ),
            (
                OrderingError::UpstreamForbidden(RemoteService::Directory),
                StatusCode::FORBIDDEN,
            ),
            (
                OrderingError::UpstreamUnavailable {
                    service: RemoteService::Directory,
                    reason: "timeout".to_string(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_bad_request_code() {
        let err = ApiError::BadRequest("missing field".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "BAD_REQUEST");
    }
}
