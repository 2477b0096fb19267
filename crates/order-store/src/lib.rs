//! Persistence for orders and their line items.
//!
//! An order and all of its items are written in one atomic step, and readers
//! never observe an order with only part of its items.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderRepository;
pub use postgres::PostgresOrderRepository;
pub use store::OrderRepository;
