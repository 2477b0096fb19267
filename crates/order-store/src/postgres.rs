use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ProductId, UserId};
use domain::{Money, Order, OrderDraft, OrderItem, OrderStatus, Quantity, StoredOrder};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{OrderRepository, Result, StoreError};

const ORDER_COLUMNS: &str =
    "id, user_id, status, total_amount, shipping_address, created_at, updated_at";

/// Which orders a read selects.
enum Selection {
    One(OrderId),
    All,
    User(UserId),
    Status(OrderStatus),
}

/// PostgreSQL-backed order store.
#[derive(Debug, Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Reads orders and their items from one snapshot, so concurrent writers
    /// can never leave a reader with a partial order.
    async fn load(&self, selection: Selection) -> Result<Vec<Order>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let base = format!("SELECT {ORDER_COLUMNS} FROM orders");
        let rows = match selection {
            Selection::One(id) => {
                sqlx::query(&format!("{base} WHERE id = $1"))
                    .bind(id.as_i64())
                    .fetch_all(&mut *tx)
                    .await?
            }
            Selection::All => {
                sqlx::query(&format!("{base} ORDER BY id ASC"))
                    .fetch_all(&mut *tx)
                    .await?
            }
            Selection::User(user_id) => {
                sqlx::query(&format!("{base} WHERE user_id = $1 ORDER BY id ASC"))
                    .bind(user_id.as_i64())
                    .fetch_all(&mut *tx)
                    .await?
            }
            Selection::Status(status) => {
                sqlx::query(&format!("{base} WHERE status = $1 ORDER BY id ASC"))
                    .bind(status.as_str())
                    .fetch_all(&mut *tx)
                    .await?
            }
        };

        let ids: Vec<i64> = rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id"))
            .collect::<std::result::Result<_, _>>()?;
        let mut items = Self::load_items(&mut tx, &ids).await?;

        tx.commit().await?;

        rows.into_iter()
            .map(|row| {
                let id = OrderId::new(row.try_get("id")?);
                let order_items = items.remove(&id).unwrap_or_default();
                Self::row_to_order(row, order_items)
            })
            .collect()
    }

    /// Explains why a guarded write matched no row.
    async fn refusal(&self, id: OrderId) -> Result<StoreError> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        Ok(match status {
            None => StoreError::OrderNotFound(id),
            Some(status) => StoreError::NotModifiable {
                order_id: id,
                status: status
                    .parse()
                    .map_err(|e: domain::OrderError| StoreError::Decode(e.to_string()))?,
            },
        })
    }

    async fn load_items(
        tx: &mut Transaction<'_, Postgres>,
        order_ids: &[i64],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>> {
        let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(items);
        }

        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, product_name, quantity, unit_price, subtotal
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&mut **tx)
        .await?;

        for row in rows {
            let item = Self::row_to_item(row)?;
            items.entry(item.order_id).or_default().push(item);
        }
        Ok(items)
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = Quantity::new(i64::from(quantity))
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(OrderItem {
            id: OrderItemId::new(row.try_get("id")?),
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity,
            unit_price: Money::new(row.try_get::<Decimal, _>("unit_price")?),
            subtotal: Money::new(row.try_get::<Decimal, _>("subtotal")?),
        })
    }

    fn row_to_order(row: PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let order_id = OrderId::new(row.try_get("id")?);
        let status: String = row.try_get("status")?;
        let status: OrderStatus = status
            .parse()
            .map_err(|e: domain::OrderError| StoreError::Decode(e.to_string()))?;

        let stored = StoredOrder {
            id: order_id,
            user_id: UserId::new(row.try_get("user_id")?),
            status,
            total_amount: Money::new(row.try_get::<Decimal, _>("total_amount")?),
            shipping_address: row.try_get("shipping_address")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
            items,
        };

        Order::try_from(stored).map_err(|source| StoreError::Corrupt { order_id, source })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert(&self, draft: OrderDraft) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO orders (user_id, status, total_amount, shipping_address, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, created_at, updated_at
            "#,
        )
        .bind(draft.user_id().as_i64())
        .bind(draft.status().as_str())
        .bind(draft.total_amount().amount())
        .bind(draft.shipping_address().as_str())
        .bind(draft.created_at())
        .fetch_one(&mut *tx)
        .await?;

        let order_id = OrderId::new(row.try_get("id")?);
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        let mut items = Vec::with_capacity(draft.lines().len());
        for line in draft.lines() {
            let quantity = i32::try_from(line.quantity().get())
                .map_err(|e| StoreError::Decode(e.to_string()))?;

            let item_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(order_id.as_i64())
            .bind(line.product_id().as_i64())
            .bind(line.product_name())
            .bind(quantity)
            .bind(line.unit_price().amount())
            .bind(line.subtotal().amount())
            .fetch_one(&mut *tx)
            .await?;

            items.push(OrderItem {
                id: OrderItemId::new(item_id),
                order_id,
                product_id: line.product_id(),
                product_name: line.product_name().to_string(),
                quantity: line.quantity(),
                unit_price: line.unit_price(),
                subtotal: line.subtotal(),
            });
        }

        tx.commit().await?;
        tracing::debug!(%order_id, items = items.len(), "order committed");

        let stored = StoredOrder {
            id: order_id,
            user_id: draft.user_id(),
            status: draft.status(),
            total_amount: draft.total_amount(),
            shipping_address: draft.shipping_address().as_str().to_string(),
            created_at,
            updated_at,
            items,
        };
        Order::try_from(stored).map_err(|source| StoreError::Corrupt { order_id, source })
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.load(Selection::One(id)).await?.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        self.load(Selection::All).await
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        self.load(Selection::User(user_id)).await
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        self.load(Selection::Status(status)).await
    }

    async fn save_status(&self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1 AND status <> ALL($4)",
        )
        .bind(order.id().as_i64())
        .bind(order.status().as_str())
        .bind(order.updated_at())
        .bind(terminal_names())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.refusal(order.id()).await?);
        }
        Ok(())
    }

    async fn delete(&self, id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND status <> ALL($2)")
            .bind(id.as_i64())
            .bind(terminal_names())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        match self.refusal(id).await? {
            StoreError::OrderNotFound(_) => Ok(false),
            refused => Err(refused),
        }
    }

    async fn sum_total_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Money> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::new(total))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn terminal_names() -> Vec<&'static str> {
    OrderStatus::TERMINAL.iter().map(OrderStatus::as_str).collect()
}
