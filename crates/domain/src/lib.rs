//! Domain layer for the order service.
//!
//! This crate provides the pure order model:
//! - `OrderDraft` and `Order` aggregates with line items frozen at order time
//! - `Money` with exact decimal arithmetic
//! - `OrderStatus` lifecycle with its transition table
//! - `OrderView` response projection

pub mod order;

pub use order::{
    MAX_QUANTITY, MAX_SHIPPING_ADDRESS_LEN, Money, Order, OrderDraft, OrderError, OrderItem,
    OrderItemView, OrderLine, OrderStatus, OrderView, Quantity, ShippingAddress, StatusChange,
    StoredOrder,
};
