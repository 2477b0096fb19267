//! Application configuration loaded from environment variables.

use std::time::Duration;

use ordering::{OrderingConfig, StockCompensation, UnknownCompensation};
use thiserror::Error;

/// Errors raised by settings that cannot fall back to a default.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("STOCK_COMPENSATION: {0}")]
    Compensation(#[from] UnknownCompensation),
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string (default: unset, in-memory store)
/// - `DIRECTORY_BASE_URL`: user directory service (default: `"http://localhost:8081"`)
/// - `INVENTORY_BASE_URL`: inventory service (default: `"http://localhost:8082"`)
/// - `REMOTE_TIMEOUT_MS`: bound on each remote call (default: `5000`)
/// - `STOCK_COMPENSATION`: `none` or `restore` (default: `none`)
/// - `METRICS_REFRESH_SECS`: refresh period of the daily amount gauge (default: `10`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub directory_base_url: String,
    pub inventory_base_url: String,
    pub remote_timeout: Duration,
    pub compensation: StockCompensation,
    pub metrics_refresh: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let compensation = match lookup("STOCK_COMPENSATION") {
            Some(value) => value.parse()?,
            None => defaults.compensation,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            directory_base_url: lookup("DIRECTORY_BASE_URL").unwrap_or(defaults.directory_base_url),
            inventory_base_url: lookup("INVENTORY_BASE_URL").unwrap_or(defaults.inventory_base_url),
            remote_timeout: lookup("REMOTE_TIMEOUT_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.remote_timeout),
            compensation,
            metrics_refresh: lookup("METRICS_REFRESH_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.metrics_refresh),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the orchestrator settings.
    pub fn ordering(&self) -> OrderingConfig {
        OrderingConfig {
            remote_timeout: self.remote_timeout,
            compensation: self.compensation,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            directory_base_url: "http://localhost:8081".to_string(),
            inventory_base_url: "http://localhost:8082".to_string(),
            remote_timeout: Duration::from_millis(5000),
            compensation: StockCompensation::None,
            metrics_refresh: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.database_url, None);
        assert_eq!(config.directory_base_url, "http://localhost:8081");
        assert_eq!(config.inventory_base_url, "http://localhost:8082");
        assert_eq!(config.remote_timeout, Duration::from_secs(5));
        assert_eq!(config.compensation, StockCompensation::None);
        assert_eq!(config.metrics_refresh, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("REMOTE_TIMEOUT_MS", "250"),
            ("STOCK_COMPENSATION", "restore"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/orders")
        );
        assert_eq!(config.ordering().remote_timeout, Duration::from_millis(250));
        assert_eq!(config.ordering().compensation, StockCompensation::Restore);
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = from_pairs(&[("PORT", "http"), ("METRICS_REFRESH_SECS", "0")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.metrics_refresh, Duration::from_secs(10));
    }

    #[test]
    fn test_unknown_compensation_is_an_error() {
        assert!(from_pairs(&[("STOCK_COMPENSATION", "saga")]).is_err());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
