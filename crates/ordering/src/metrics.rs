//! Metrics sink for order events.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use domain::{Money, OrderStatus};
use rust_decimal::prelude::ToPrimitive;

/// Receives counts of created orders and status transitions.
pub trait OrderMetrics: Send + Sync {
    /// An order was persisted in the given status.
    fn order_created(&self, status: OrderStatus);

    /// An order moved from one status to another.
    fn status_changed(&self, from: OrderStatus, to: OrderStatus);

    /// A creation attempt finished, successfully or not.
    fn creation_finished(&self, elapsed: Duration, succeeded: bool);

    /// The sum of totals of orders created today.
    fn amount_today(&self, amount: Money);
}

impl<T: OrderMetrics + ?Sized> OrderMetrics for Arc<T> {
    fn order_created(&self, status: OrderStatus) {
        (**self).order_created(status)
    }

    fn status_changed(&self, from: OrderStatus, to: OrderStatus) {
        (**self).status_changed(from, to)
    }

    fn creation_finished(&self, elapsed: Duration, succeeded: bool) {
        (**self).creation_finished(elapsed, succeeded)
    }

    fn amount_today(&self, amount: Money) {
        (**self).amount_today(amount)
    }
}

/// Records order metrics through the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusOrderMetrics;

impl OrderMetrics for PrometheusOrderMetrics {
    fn order_created(&self, status: OrderStatus) {
        metrics::counter!("order_created_total", "status" => status.as_str()).increment(1);
    }

    fn status_changed(&self, from: OrderStatus, to: OrderStatus) {
        metrics::counter!(
            "order_status_changed_total",
            "from" => from.as_str(),
            "to" => to.as_str()
        )
        .increment(1);
    }

    fn creation_finished(&self, elapsed: Duration, succeeded: bool) {
        let outcome = if succeeded { "success" } else { "failure" };
        metrics::histogram!("order_creation_duration_seconds", "outcome" => outcome)
            .record(elapsed.as_secs_f64());
    }

    fn amount_today(&self, amount: Money) {
        // The gauge is for dashboards; the exact value stays in the store.
        let value = amount.amount().to_f64().unwrap_or_default();
        metrics::gauge!("orders_amount_today").set(value);
    }
}

#[derive(Debug, Default)]
struct Recorded {
    created: Vec<OrderStatus>,
    changes: Vec<(OrderStatus, OrderStatus)>,
    creations: Vec<bool>,
    amount_today: Option<Money>,
}

/// Metrics sink that keeps every event in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingMetrics {
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Recorded) -> T) -> T {
        let mut recorded = self.recorded.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut recorded)
    }

    /// Statuses reported for created orders.
    pub fn created(&self) -> Vec<OrderStatus> {
        self.with(|r| r.created.clone())
    }

    /// Reported status changes, as `(from, to)`.
    pub fn changes(&self) -> Vec<(OrderStatus, OrderStatus)> {
        self.with(|r| r.changes.clone())
    }

    /// Outcomes of finished creation attempts.
    pub fn creations(&self) -> Vec<bool> {
        self.with(|r| r.creations.clone())
    }

    /// The last reported amount for today.
    pub fn last_amount_today(&self) -> Option<Money> {
        self.with(|r| r.amount_today)
    }
}

impl OrderMetrics for RecordingMetrics {
    fn order_created(&self, status: OrderStatus) {
        self.with(|r| r.created.push(status));
    }

    fn status_changed(&self, from: OrderStatus, to: OrderStatus) {
        self.with(|r| r.changes.push((from, to)));
    }

    fn creation_finished(&self, _elapsed: Duration, succeeded: bool) {
        self.with(|r| r.creations.push(succeeded));
    }

    fn amount_today(&self, amount: Money) {
        self.with(|r| r.amount_today = Some(amount));
    }
}
