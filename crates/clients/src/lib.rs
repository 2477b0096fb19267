//! Clients for the remote services an order depends on.
//!
//! Each service is a trait with two implementations: one speaking HTTP/JSON
//! through `reqwest`, and one in memory that records every call for tests.
//! The caller's credential is threaded explicitly into every call and
//! forwarded unchanged.

pub mod directory;
pub mod error;
mod http;
pub mod inventory;

pub use directory::{DirectoryCall, DirectoryClient, HttpDirectoryClient, InMemoryDirectory, UserRecord};
pub use error::{RemoteError, RemoteService, Result};
pub use inventory::{
    HttpInventoryClient, InMemoryInventory, InventoryCall, InventoryClient, ProductRecord,
};
