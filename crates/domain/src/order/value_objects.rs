//! Value objects for the order domain.

use std::str::FromStr;

use common::{OrderId, OrderItemId, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::OrderError;

/// Maximum length of a shipping address, in characters.
pub const MAX_SHIPPING_ADDRESS_LEN: usize = 300;

/// Monetary amount held as an exact decimal.
///
/// Arithmetic never goes through binary floating point, so `19.99 × 3`
/// is exactly `59.97`. Amounts are written with at least two decimal places.
///
/// JSON numbers are decoded from their literal text rather than through
/// `f64`, so `10.00` keeps its scale and long amounts keep every digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    /// Wraps a decimal amount.
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the underlying decimal amount.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Multiplies by a quantity. Returns None if the result leaves the
    /// decimal range.
    pub fn checked_mul(&self, quantity: Quantity) -> Option<Money> {
        self.0.checked_mul(Decimal::from(quantity.get())).map(Money)
    }

    /// Adds two amounts. Returns None if the result leaves the decimal range.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Sums amounts, failing on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut amount = self.0;
        if amount.scale() < 2 {
            amount.rescale(2);
        }
        write!(f, "{amount}")
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s).map(Money)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        rust_decimal::serde::arbitrary_precision::deserialize(deserializer).map(Money)
    }
}

/// Largest quantity a single line may carry.
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

/// Ordered quantity of a product, between one and [`MAX_QUANTITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// Validates a requested quantity.
    pub fn new(quantity: i64) -> Result<Self, OrderError> {
        if !(1..=MAX_QUANTITY).contains(&quantity) {
            return Err(OrderError::InvalidQuantity { quantity });
        }
        u32::try_from(quantity)
            .map(Self)
            .map_err(|_| OrderError::InvalidQuantity { quantity })
    }

    /// Returns the quantity as an unsigned integer.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-blank delivery address of at most [`MAX_SHIPPING_ADDRESS_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShippingAddress(String);

impl ShippingAddress {
    /// Validates a shipping address.
    pub fn new(address: impl Into<String>) -> Result<Self, OrderError> {
        let address = address.into();
        if address.trim().is_empty() {
            return Err(OrderError::BlankShippingAddress);
        }
        let length = address.chars().count();
        if length > MAX_SHIPPING_ADDRESS_LEN {
            return Err(OrderError::ShippingAddressTooLong {
                length,
                max: MAX_SHIPPING_ADDRESS_LEN,
            });
        }
        Ok(Self(address))
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShippingAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A line of a not-yet-persisted order.
///
/// Name and unit price are snapshots taken from the inventory service when the
/// line is built; the subtotal is computed once here and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    product_id: ProductId,
    product_name: String,
    quantity: Quantity,
    unit_price: Money,
    subtotal: Money,
}

impl OrderLine {
    /// Creates a line and computes its subtotal.
    ///
    /// Fails with [`OrderError::AmountOverflow`] if the subtotal does not fit
    /// the decimal range.
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: Quantity,
        unit_price: Money,
    ) -> Result<Self, OrderError> {
        let subtotal = unit_price
            .checked_mul(quantity)
            .ok_or(OrderError::AmountOverflow)?;
        Ok(Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            subtotal,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    /// Attaches storage-assigned identifiers to the line.
    pub fn into_item(self, id: OrderItemId, order_id: OrderId) -> OrderItem {
        OrderItem {
            id,
            order_id,
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            subtotal: self.subtotal,
        }
    }
}

/// A persisted line item. Only ever exists inside its owning [`Order`](super::Order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub subtotal: Money,
}
