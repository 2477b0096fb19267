//! Inventory (product) service client trait, HTTP and in-memory implementations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{Credential, ProductId};
use domain::Money;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{RemoteError, RemoteService, Result};
use crate::http::RemoteHttp;

/// A product as returned by the inventory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    pub price: Money,
    /// Stock on hand. `None` when the service did not report it.
    #[serde(default)]
    pub stock: Option<i64>,
}

impl ProductRecord {
    /// Creates a product record with a known stock level.
    pub fn new(id: ProductId, name: impl Into<String>, price: Money, stock: i64) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            stock: Some(stock),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockUpdate {
    new_stock: i64,
}

/// Trait for product lookups and stock writes against the inventory service.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Fetches a product by id.
    ///
    /// `Ok(None)` means the service answered successfully with an empty body.
    async fn get_product(
        &self,
        id: ProductId,
        credential: Option<&Credential>,
    ) -> Result<Option<ProductRecord>>;

    /// Replaces the product's stock with an absolute quantity.
    async fn set_stock(
        &self,
        id: ProductId,
        new_stock: i64,
        credential: Option<&Credential>,
    ) -> Result<()>;

    /// Returns true if the service reports itself healthy.
    async fn is_available(&self) -> bool;
}

#[async_trait]
impl<T: InventoryClient + ?Sized> InventoryClient for Arc<T> {
    async fn get_product(
        &self,
        id: ProductId,
        credential: Option<&Credential>,
    ) -> Result<Option<ProductRecord>> {
        (**self).get_product(id, credential).await
    }

    async fn set_stock(
        &self,
        id: ProductId,
        new_stock: i64,
        credential: Option<&Credential>,
    ) -> Result<()> {
        (**self).set_stock(id, new_stock, credential).await
    }

    async fn is_available(&self) -> bool {
        (**self).is_available().await
    }
}

/// Inventory client speaking HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpInventoryClient {
    http: RemoteHttp,
}

impl HttpInventoryClient {
    /// Creates a client for the service at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, reqwest::Error> {
        Ok(Self {
            http: RemoteHttp::new(RemoteService::Inventory, base_url, timeout)?,
        })
    }
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    #[tracing::instrument(skip(self, credential), fields(product_id = %id))]
    async fn get_product(
        &self,
        id: ProductId,
        credential: Option<&Credential>,
    ) -> Result<Option<ProductRecord>> {
        let request = self
            .http
            .request(Method::GET, &format!("/api/v1/products/{id}"), credential);
        let response = self.http.send(request).await?;
        self.http.decode_optional(response).await
    }

    #[tracing::instrument(skip(self, credential), fields(product_id = %id))]
    async fn set_stock(
        &self,
        id: ProductId,
        new_stock: i64,
        credential: Option<&Credential>,
    ) -> Result<()> {
        let request = self
            .http
            .request(
                Method::PATCH,
                &format!("/api/v1/products/{id}/stock"),
                credential,
            )
            .json(&StockUpdate { new_stock });
        self.http.send(request).await?;
        Ok(())
    }

    async fn is_available(&self) -> bool {
        self.http.probe().await
    }
}

/// A recorded inventory call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryCall {
    GetProduct {
        product_id: ProductId,
        credential: Option<Credential>,
    },
    SetStock {
        product_id: ProductId,
        new_stock: i64,
        credential: Option<Credential>,
    },
}

impl InventoryCall {
    /// Returns the product the call was made for.
    pub fn product_id(&self) -> ProductId {
        match self {
            InventoryCall::GetProduct { product_id, .. }
            | InventoryCall::SetStock { product_id, .. } => *product_id,
        }
    }

    /// Returns the credential forwarded with the call.
    pub fn credential(&self) -> Option<&Credential> {
        match self {
            InventoryCall::GetProduct { credential, .. }
            | InventoryCall::SetStock { credential, .. } => credential.as_ref(),
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    products: HashMap<ProductId, ProductRecord>,
    calls: Vec<InventoryCall>,
    get_failures: HashMap<ProductId, RemoteError>,
    set_failures: HashMap<ProductId, (RemoteError, usize)>,
    delay: Option<Duration>,
    down: bool,
}

/// In-memory inventory service for testing.
///
/// Stock writes replace the stored stock, so later lookups observe them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventory {
    /// Creates a new empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a product.
    pub async fn add_product(&self, product: ProductRecord) {
        self.state.write().await.products.insert(product.id, product);
    }

    /// Makes lookups of one product fail with the given error.
    pub async fn fail_get(&self, id: ProductId, failure: RemoteError) {
        self.state.write().await.get_failures.insert(id, failure);
    }

    /// Makes stock writes for one product fail with the given error.
    pub async fn fail_set(&self, id: ProductId, failure: RemoteError) {
        self.fail_set_after(id, 0, failure).await;
    }

    /// Lets `successes` stock writes for one product through, then fails the rest.
    pub async fn fail_set_after(&self, id: ProductId, successes: usize, failure: RemoteError) {
        self.state
            .write()
            .await
            .set_failures
            .insert(id, (failure, successes));
    }

    /// Delays every call by the given duration.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().await.delay = delay;
    }

    /// Marks the service as down for health probes.
    pub async fn set_down(&self, down: bool) {
        self.state.write().await.down = down;
    }

    /// Returns the current stock of a product.
    pub async fn stock(&self, id: ProductId) -> Option<i64> {
        self.state
            .read()
            .await
            .products
            .get(&id)
            .and_then(|product| product.stock)
    }

    /// Returns every call made so far.
    pub async fn calls(&self) -> Vec<InventoryCall> {
        self.state.read().await.calls.clone()
    }

    /// Returns the stock writes made so far, as `(product, new_stock)`.
    pub async fn stock_writes(&self) -> Vec<(ProductId, i64)> {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter_map(|call| match call {
                InventoryCall::SetStock {
                    product_id,
                    new_stock,
                    ..
                } => Some((*product_id, *new_stock)),
                InventoryCall::GetProduct { .. } => None,
            })
            .collect()
    }

    /// Returns the number of calls made so far.
    pub async fn call_count(&self) -> usize {
        self.state.read().await.calls.len()
    }

    async fn record(&self, call: InventoryCall) {
        let delay = {
            let mut state = self.state.write().await;
            state.calls.push(call);
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl InventoryClient for InMemoryInventory {
    async fn get_product(
        &self,
        id: ProductId,
        credential: Option<&Credential>,
    ) -> Result<Option<ProductRecord>> {
        self.record(InventoryCall::GetProduct {
            product_id: id,
            credential: credential.cloned(),
        })
        .await;

        let state = self.state.read().await;
        if let Some(failure) = state.get_failures.get(&id) {
            return Err(failure.clone());
        }
        state
            .products
            .get(&id)
            .cloned()
            .map(Some)
            .ok_or(RemoteError::NotFound)
    }

    async fn set_stock(
        &self,
        id: ProductId,
        new_stock: i64,
        credential: Option<&Credential>,
    ) -> Result<()> {
        self.record(InventoryCall::SetStock {
            product_id: id,
            new_stock,
            credential: credential.cloned(),
        })
        .await;

        let mut state = self.state.write().await;
        if let Some((failure, remaining)) = state.set_failures.get_mut(&id) {
            if *remaining == 0 {
                return Err(failure.clone());
            }
            *remaining -= 1;
        }
        let product = state.products.get_mut(&id).ok_or(RemoteError::NotFound)?;
        product.stock = Some(new_stock);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        !self.state.read().await.down
    }
}
