//! Ordering error taxonomy.

use clients::{RemoteError, RemoteService};
use common::{OrderId, ProductId, UserId};
use domain::{OrderError, OrderStatus};
use order_store::StoreError;
use thiserror::Error;

/// Errors that can occur while creating or managing orders.
///
/// Every failure aborts the whole operation. Variants carry the offending
/// ids and services as data so the boundary layer can map them without
/// parsing messages.
#[derive(Debug, Error)]
pub enum OrderingError {
    /// The request was rejected before any remote call was made.
    #[error("Validation failed: {0}")]
    ValidationFailed(#[source] OrderError),

    /// The directory service does not know the user.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The inventory service does not know the product.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The product's stock on hand is below the requested quantity, or unknown.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {}", display_stock(.available))]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: Option<i64>,
    },

    /// A remote service timed out, failed or answered garbage.
    #[error("{service} service unavailable: {reason}")]
    UpstreamUnavailable {
        service: RemoteService,
        reason: String,
    },

    /// A remote service rejected the forwarded credential.
    #[error("{0} service rejected the credential")]
    UpstreamUnauthorized(RemoteService),

    /// A remote service refused access with the forwarded credential.
    #[error("{0} service refused access")]
    UpstreamForbidden(RemoteService),

    /// No order exists with the given id.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order is in a terminal status.
    #[error("Order cannot be modified in {0} status")]
    OrderNotModifiable(OrderStatus),

    /// The text does not name a known status.
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    /// Persistence failure.
    #[error("Store error: {0}")]
    Store(#[source] StoreError),
}

fn display_stock(available: &Option<i64>) -> String {
    match available {
        Some(stock) => stock.to_string(),
        None => "unknown".to_string(),
    }
}

impl OrderingError {
    /// Returns a stable identifier for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            OrderingError::ValidationFailed(_) => "VALIDATION_FAILED",
            OrderingError::UserNotFound(_) => "USER_NOT_FOUND",
            OrderingError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            OrderingError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            OrderingError::UpstreamUnavailable { .. } => "SERVICE_UNAVAILABLE",
            OrderingError::UpstreamUnauthorized(_) => "SERVICE_UNAUTHORIZED",
            OrderingError::UpstreamForbidden(_) => "SERVICE_FORBIDDEN",
            OrderingError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            OrderingError::OrderNotModifiable(_) => "ORDER_NOT_MODIFIABLE",
            OrderingError::InvalidStatus(_) => "INVALID_STATUS",
            OrderingError::Store(_) => "STORE_ERROR",
        }
    }

    /// Classifies a failed remote call.
    ///
    /// `not_found` decides what a 404 means for this particular call.
    pub(crate) fn from_remote(
        service: RemoteService,
        err: RemoteError,
        not_found: impl FnOnce() -> OrderingError,
    ) -> Self {
        tracing::warn!(%service, error = %err, "remote call failed");
        match err {
            RemoteError::NotFound => not_found(),
            RemoteError::Unauthorized => OrderingError::UpstreamUnauthorized(service),
            RemoteError::Forbidden => OrderingError::UpstreamForbidden(service),
            RemoteError::Unavailable(reason) => {
                OrderingError::UpstreamUnavailable { service, reason }
            }
        }
    }
}

impl From<OrderError> for OrderingError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidStatus { value } => OrderingError::InvalidStatus(value),
            OrderError::NotModifiable { status } => OrderingError::OrderNotModifiable(status),
            other => OrderingError::ValidationFailed(other),
        }
    }
}

impl From<StoreError> for OrderingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(id) => OrderingError::OrderNotFound(id),
            StoreError::NotModifiable { status, .. } => OrderingError::OrderNotModifiable(status),
            other => OrderingError::Store(other),
        }
    }
}

/// Convenience type alias for ordering results.
pub type Result<T> = std::result::Result<T, OrderingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_errors_are_classified_per_service() {
        let err = OrderingError::from_remote(RemoteService::Directory, RemoteError::NotFound, || {
            OrderingError::UserNotFound(UserId::new(1))
        });
        assert!(matches!(err, OrderingError::UserNotFound(_)));

        let err = OrderingError::from_remote(
            RemoteService::Inventory,
            RemoteError::Forbidden,
            || unreachable!(),
        );
        assert!(matches!(
            err,
            OrderingError::UpstreamForbidden(RemoteService::Inventory)
        ));

        let err = OrderingError::from_remote(
            RemoteService::Directory,
            RemoteError::Unavailable("connection refused".to_string()),
            || unreachable!(),
        );
        assert_eq!(err.code(), "SERVICE_UNAVAILABLE");
        assert_eq!(
            err.to_string(),
            "DIRECTORY service unavailable: connection refused"
        );
    }

    #[test]
    fn test_order_errors_map_to_lifecycle_kinds() {
        let err: OrderingError = OrderError::InvalidStatus {
            value: "NOPE".to_string(),
        }
        .into();
        assert!(matches!(err, OrderingError::InvalidStatus(ref v) if v == "NOPE"));

        let err: OrderingError = OrderError::NotModifiable {
            status: OrderStatus::Delivered,
        }
        .into();
        assert!(matches!(
            err,
            OrderingError::OrderNotModifiable(OrderStatus::Delivered)
        ));

        let err: OrderingError = OrderError::NoItems.into();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_missing_order_in_store_is_order_not_found() {
        let err: OrderingError = StoreError::OrderNotFound(OrderId::new(9)).into();
        assert!(matches!(err, OrderingError::OrderNotFound(id) if id == OrderId::new(9)));
    }

    #[test]
    fn test_refused_store_write_is_order_not_modifiable() {
        let err: OrderingError = StoreError::NotModifiable {
            order_id: OrderId::new(9),
            status: OrderStatus::Cancelled,
        }
        .into();
        assert!(matches!(
            err,
            OrderingError::OrderNotModifiable(OrderStatus::Cancelled)
        ));
    }

    #[test]
    fn test_insufficient_stock_message_handles_unknown_stock() {
        let err = OrderingError::InsufficientStock {
            product_id: ProductId::new(3),
            requested: 2,
            available: None,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product 3: requested 2, available unknown"
        );
    }
}
