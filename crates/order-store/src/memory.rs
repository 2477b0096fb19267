use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, UserId};
use domain::{Money, Order, OrderDraft, OrderStatus};
use tokio::sync::RwLock;

use crate::{OrderRepository, Result, StoreError};

#[derive(Debug, Default)]
struct Tables {
    orders: BTreeMap<OrderId, Order>,
    last_order_id: i64,
    last_item_id: i64,
    fail_on_insert: bool,
    unavailable: bool,
}

/// In-memory order store for tests and local runs.
///
/// A single lock guards the whole table, so an order and its items are
/// inserted and removed as one unit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryOrderRepository {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to reject subsequent inserts.
    pub async fn set_fail_on_insert(&self, fail: bool) {
        self.tables.write().await.fail_on_insert = fail;
    }

    /// Makes every subsequent operation fail as if the backend were down.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.tables.write().await.unavailable = unavailable;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the number of stored line items across all orders.
    pub async fn item_count(&self) -> usize {
        self.tables
            .read()
            .await
            .orders
            .values()
            .map(Order::item_count)
            .sum()
    }

    async fn select(&self, filter: impl Fn(&Order) -> bool) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        tables.ensure_available()?;
        Ok(tables
            .orders
            .values()
            .filter(|order| filter(order))
            .cloned()
            .collect())
    }
}

impl Tables {
    fn ensure_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(StoreError::Unavailable("store is down".to_string()));
        }
        Ok(())
    }

    /// Rejects writes to an order that has reached a terminal status.
    fn ensure_modifiable(&self, id: OrderId) -> Result<()> {
        let stored = self.orders.get(&id).ok_or(StoreError::OrderNotFound(id))?;
        if stored.is_terminal() {
            return Err(StoreError::NotModifiable {
                order_id: id,
                status: stored.status(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, draft: OrderDraft) -> Result<Order> {
        let mut tables = self.tables.write().await;
        tables.ensure_available()?;

        if tables.fail_on_insert {
            return Err(StoreError::Unavailable("insert rejected".to_string()));
        }

        tables.last_order_id += 1;
        let order_id = OrderId::new(tables.last_order_id);

        let mut last_item_id = tables.last_item_id;
        let order = draft.into_order(order_id, || {
            last_item_id += 1;
            OrderItemId::new(last_item_id)
        });
        tables.last_item_id = last_item_id;

        tables.orders.insert(order_id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        tables.ensure_available()?;
        Ok(tables.orders.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        self.select(|_| true).await
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        self.select(|order| order.user_id() == user_id).await
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        self.select(|order| order.status() == status).await
    }

    async fn save_status(&self, order: &Order) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.ensure_available()?;
        tables.ensure_modifiable(order.id())?;
        tables.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn delete(&self, id: OrderId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        tables.ensure_available()?;
        match tables.ensure_modifiable(id) {
            Ok(()) => Ok(tables.orders.remove(&id).is_some()),
            Err(StoreError::OrderNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn sum_total_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Money> {
        let tables = self.tables.read().await;
        tables.ensure_available()?;
        let totals = tables
            .orders
            .values()
            .filter(|order| order.created_at() >= from && order.created_at() < to)
            .map(Order::total_amount);
        Money::checked_sum(totals)
            .ok_or_else(|| StoreError::Decode("sum of order totals overflows".to_string()))
    }

    async fn ping(&self) -> Result<()> {
        self.tables.read().await.ensure_available()
    }
}
