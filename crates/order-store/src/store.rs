use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{Money, Order, OrderDraft, OrderStatus};

use crate::Result;

/// Core trait for order persistence.
///
/// All implementations must be thread-safe (Send + Sync). Every read returns
/// whole orders: an order together with all of its items, in insertion order.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists a draft and all of its lines atomically - either everything is
    /// committed or nothing is.
    ///
    /// Returns the order with its storage-assigned ids.
    async fn insert(&self, draft: OrderDraft) -> Result<Order>;

    /// Loads an order by id. Returns None if it doesn't exist.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Loads every order, oldest first.
    async fn list(&self) -> Result<Vec<Order>>;

    /// Loads the orders owned by a user, oldest first.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Loads the orders currently in `status`, oldest first.
    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>>;

    /// Persists the status and last-update timestamp of an existing order.
    ///
    /// The write only applies while the stored order is still non-terminal, so
    /// a concurrent move to `DELIVERED` or `CANCELLED` is never overwritten.
    /// Fails with `OrderNotFound` if the order no longer exists and with
    /// `NotModifiable` if it has reached a terminal status.
    async fn save_status(&self, order: &Order) -> Result<()>;

    /// Deletes a non-terminal order and all of its items.
    ///
    /// Returns false if there was nothing to delete. Fails with
    /// `NotModifiable` if the stored order is in a terminal status.
    async fn delete(&self, id: OrderId) -> Result<bool>;

    /// Sums the totals of orders created in `[from, to)`.
    async fn sum_total_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Money>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
impl<T: OrderRepository + ?Sized> OrderRepository for Arc<T> {
    async fn insert(&self, draft: OrderDraft) -> Result<Order> {
        (**self).insert(draft).await
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        (**self).get(id).await
    }

    async fn list(&self) -> Result<Vec<Order>> {
        (**self).list().await
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        (**self).find_by_user(user_id).await
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        (**self).find_by_status(status).await
    }

    async fn save_status(&self, order: &Order) -> Result<()> {
        (**self).save_status(order).await
    }

    async fn delete(&self, id: OrderId) -> Result<bool> {
        (**self).delete(id).await
    }

    async fn sum_total_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Money> {
        (**self).sum_total_between(from, to).await
    }

    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }
}
