//! Remote call error types.

use thiserror::Error;

/// The remote collaborator a call was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteService {
    /// The user directory service.
    Directory,
    /// The product and inventory service.
    Inventory,
}

impl RemoteService {
    /// Returns the service name used in error messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteService::Directory => "DIRECTORY",
            RemoteService::Inventory => "INVENTORY",
        }
    }
}

impl std::fmt::Display for RemoteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified outcome of a failed remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The remote service answered 404 for the requested resource.
    #[error("resource not found")]
    NotFound,

    /// The remote service rejected the forwarded credential (401).
    #[error("credential rejected")]
    Unauthorized,

    /// The remote service refused access with the forwarded credential (403).
    #[error("access forbidden")]
    Forbidden,

    /// Timeout, connection failure, 5xx or an undecodable body.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Unavailable(err.to_string())
    }
}

/// Convenience type alias for remote call results.
pub type Result<T> = std::result::Result<T, RemoteError>;
