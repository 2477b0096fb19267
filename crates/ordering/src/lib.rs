//! Order creation and status lifecycle operations.
//!
//! `OrderService` coordinates the remote directory and inventory services
//! with the order store:
//! 1. Validate the request (no remote call on failure)
//! 2. Resolve the user
//! 3. For each line, in request order: read the product, check stock,
//!    snapshot name and price, write back the reduced stock
//! 4. Persist the order and its items atomically
//!
//! Status changes and deletions go through the order's lifecycle guard.

pub mod config;
pub mod error;
pub mod metrics;
pub mod request;
pub mod service;

pub use config::{OrderingConfig, StockCompensation, UnknownCompensation};
pub use error::{OrderingError, Result};
pub use metrics::{OrderMetrics, PrometheusOrderMetrics, RecordingMetrics};
pub use request::{CreateOrderRequest, OrderLineRequest, UpdateStatusRequest};
pub use service::{OrderService, UpstreamStatus};
