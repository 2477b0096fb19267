//! Order aggregate and related types.

mod aggregate;
mod status;
mod value_objects;
mod view;

pub use aggregate::{Order, OrderDraft, StatusChange, StoredOrder};
pub use status::OrderStatus;
pub use value_objects::{
    MAX_QUANTITY, MAX_SHIPPING_ADDRESS_LEN, Money, OrderItem, OrderLine, Quantity,
    ShippingAddress,
};
pub use view::{OrderItemView, OrderView};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// An order must contain at least one line item.
    #[error("Order has no items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be between 1 and {max})", max = MAX_QUANTITY)]
    InvalidQuantity { quantity: i64 },

    /// Shipping address is empty or whitespace.
    #[error("Shipping address is required")]
    BlankShippingAddress,

    /// Shipping address exceeds the column limit.
    #[error("Shipping address is {length} characters long (max {max})")]
    ShippingAddressTooLong { length: usize, max: usize },

    /// The text does not name a known status.
    #[error("Invalid order status: {value}")]
    InvalidStatus { value: String },

    /// The order is in a terminal status.
    #[error("Order cannot be modified in {status} status")]
    NotModifiable { status: OrderStatus },

    /// Stored total disagrees with the stored line subtotals.
    #[error("Stored total {stored} does not match line subtotals {computed}")]
    TotalMismatch { stored: Money, computed: Money },

    /// A subtotal or total does not fit the decimal range.
    #[error("Amount overflows the supported decimal range")]
    AmountOverflow,
}
