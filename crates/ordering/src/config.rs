//! Orchestrator settings.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default bound on any single remote call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// What to do with stock deductions already issued when a later step of the
/// same creation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockCompensation {
    /// Leave the deductions in place and log them.
    #[default]
    None,

    /// Write back the pre-deduction stock of every issued deduction, newest
    /// first, before returning the original error.
    Restore,
}

/// Error returned when parsing an unknown compensation policy name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown stock compensation policy: {0} (expected `none` or `restore`)")]
pub struct UnknownCompensation(pub String);

impl FromStr for StockCompensation {
    type Err = UnknownCompensation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(StockCompensation::None),
            "restore" => Ok(StockCompensation::Restore),
            _ => Err(UnknownCompensation(s.to_string())),
        }
    }
}

/// Settings for [`crate::OrderService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingConfig {
    /// Upper bound on each remote call; expiry surfaces as unavailable.
    pub remote_timeout: Duration,
    pub compensation: StockCompensation,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            compensation: StockCompensation::None,
        }
    }
}
