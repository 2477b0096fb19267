use common::OrderId;
use domain::{OrderError, OrderStatus};
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The stored order is in a terminal status and may no longer change.
    #[error("Order {order_id} cannot be modified in {status} status")]
    NotModifiable {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Stored rows do not form a valid order.
    #[error("Corrupt order {order_id}: {source}")]
    Corrupt {
        order_id: OrderId,
        #[source]
        source: OrderError,
    },

    /// A stored value could not be decoded.
    #[error("Invalid stored value: {0}")]
    Decode(String),

    /// The backend refused the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
