//! Shared types used across the order service crates.

pub mod credential;
pub mod types;

pub use credential::Credential;
pub use types::{OrderId, OrderItemId, ProductId, UserId};
