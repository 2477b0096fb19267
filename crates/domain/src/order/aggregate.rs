//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, UserId};

use super::{
    Money, OrderError, OrderItem, OrderLine, OrderStatus, OrderView, ShippingAddress,
    view::OrderItemView,
};

/// An order that has been validated and priced but not yet persisted.
///
/// Always holds at least one line, and `total_amount` is the sum of the line
/// subtotals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    user_id: UserId,
    shipping_address: ShippingAddress,
    lines: Vec<OrderLine>,
    total_amount: Money,
    created_at: DateTime<Utc>,
}

impl OrderDraft {
    /// Builds a draft in `PENDING` status from priced lines.
    pub fn new(
        user_id: UserId,
        shipping_address: ShippingAddress,
        lines: Vec<OrderLine>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::NoItems);
        }
        let total_amount = Money::checked_sum(lines.iter().map(OrderLine::subtotal))
            .ok_or(OrderError::AmountOverflow)?;

        Ok(Self {
            user_id,
            shipping_address,
            lines,
            total_amount,
            created_at,
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Status every new order starts in.
    pub fn status(&self) -> OrderStatus {
        OrderStatus::Pending
    }

    /// Turns the draft into a persisted order using storage-assigned ids.
    ///
    /// `next_item_id` is called once per line, in line order.
    pub fn into_order(
        self,
        id: OrderId,
        mut next_item_id: impl FnMut() -> OrderItemId,
    ) -> Order {
        let items = self
            .lines
            .into_iter()
            .map(|line| line.into_item(next_item_id(), id))
            .collect();

        Order {
            id,
            user_id: self.user_id,
            status: OrderStatus::Pending,
            total_amount: self.total_amount,
            shipping_address: self.shipping_address,
            items,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Raw order data as read back from storage.
#[derive(Debug, Clone)]
pub struct StoredOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// A status change accepted by [`Order::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Order aggregate root.
///
/// Owns its line items exclusively. Identity, owner, creation time, total and
/// items are fixed once persisted; only the status and the last-update
/// timestamp change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    total_amount: Money,
    shipping_address: ShippingAddress,
    items: Vec<OrderItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StoredOrder> for Order {
    type Error = OrderError;

    fn try_from(stored: StoredOrder) -> Result<Self, Self::Error> {
        if stored.items.is_empty() {
            return Err(OrderError::NoItems);
        }

        let order = Order {
            id: stored.id,
            user_id: stored.user_id,
            status: stored.status,
            total_amount: stored.total_amount,
            shipping_address: ShippingAddress::new(stored.shipping_address)?,
            items: stored.items,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        };

        let computed = order.recompute_total()?;
        if computed != order.total_amount {
            return Err(OrderError::TotalMismatch {
                stored: order.total_amount,
                computed,
            });
        }

        Ok(order)
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the stored total.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    /// Returns the items in insertion order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Creation timestamp, also reported as the order date.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Sums the stored line subtotals.
    ///
    /// Only used to verify the stored total; reads always report
    /// [`Order::total_amount`].
    pub fn recompute_total(&self) -> Result<Money, OrderError> {
        Money::checked_sum(self.items.iter().map(|item| item.subtotal))
            .ok_or(OrderError::AmountOverflow)
    }

    /// Read-only projection to the external response shape.
    pub fn to_view(&self) -> OrderView {
        OrderView {
            id: self.id,
            user_id: self.user_id,
            order_date: self.created_at,
            status: self.status,
            total_amount: self.total_amount,
            shipping_address: self.shipping_address.as_str().to_string(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            items: self
                .items
                .iter()
                .map(|item| OrderItemView {
                    id: item.id,
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    quantity: item.quantity.get(),
                    unit_price: item.unit_price,
                    subtotal: item.subtotal,
                })
                .collect(),
        }
    }
}

// Lifecycle guard
impl Order {
    /// Moves the order to the status named by `requested`.
    ///
    /// Unparseable names fail with `InvalidStatus`; orders in a terminal status
    /// fail with `NotModifiable`, even when the same terminal status is
    /// requested again. The order is left untouched on failure.
    pub fn transition(
        &mut self,
        requested: &str,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, OrderError> {
        let next: OrderStatus = requested.parse()?;

        if !self.status.can_transition_to(next) {
            return Err(OrderError::NotModifiable {
                status: self.status,
            });
        }

        let change = StatusChange {
            from: self.status,
            to: next,
        };
        self.status = next;
        self.updated_at = now;
        Ok(change)
    }

    /// Checks that the order may be deleted.
    pub fn ensure_deletable(&self) -> Result<(), OrderError> {
        if self.status.can_delete() {
            Ok(())
        } else {
            Err(OrderError::NotModifiable {
                status: self.status,
            })
        }
    }
}
