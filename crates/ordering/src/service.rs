//! Order creation orchestrator and lifecycle operations.

use std::future::Future;
use std::time::Instant;

use chrono::{Duration, NaiveTime, Utc};
use clients::{DirectoryClient, InventoryClient, RemoteError, RemoteService};
use common::{Credential, OrderId, ProductId, UserId};
use domain::{Money, Order, OrderDraft, OrderLine, OrderStatus, OrderView, Quantity, ShippingAddress};
use order_store::OrderRepository;

use crate::config::{OrderingConfig, StockCompensation};
use crate::error::{OrderingError, Result};
use crate::metrics::OrderMetrics;
use crate::request::CreateOrderRequest;

/// A stock write already issued for the order being created.
#[derive(Debug, Clone, Copy)]
struct Deduction {
    product_id: ProductId,
    previous: i64,
    new_stock: i64,
}

/// Availability of the order store and the remote collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamStatus {
    pub database: bool,
    pub directory: bool,
    pub inventory: bool,
}

impl UpstreamStatus {
    pub fn all_available(&self) -> bool {
        self.database && self.directory && self.inventory
    }
}

/// Creates orders against the directory and inventory services and governs
/// their status lifecycle.
///
/// Creation runs as one sequential unit: the user is resolved once, then
/// every line is priced and deducted in request order, and the first failure
/// aborts the whole request. Stock deductions are plain absolute writes, so
/// the ones issued before a failure stay in place unless
/// [`StockCompensation::Restore`] is configured.
pub struct OrderService<R, D, I, M>
where
    R: OrderRepository,
    D: DirectoryClient,
    I: InventoryClient,
    M: OrderMetrics,
{
    repository: R,
    directory: D,
    inventory: I,
    metrics: M,
    config: OrderingConfig,
}

impl<R, D, I, M> OrderService<R, D, I, M>
where
    R: OrderRepository,
    D: DirectoryClient,
    I: InventoryClient,
    M: OrderMetrics,
{
    /// Creates a new order service.
    pub fn new(repository: R, directory: D, inventory: I, metrics: M, config: OrderingConfig) -> Self {
        Self {
            repository,
            directory,
            inventory,
            metrics,
            config,
        }
    }

    /// Returns the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns the configured settings.
    pub fn config(&self) -> &OrderingConfig {
        &self.config
    }

    /// Places an order.
    ///
    /// The request is validated before any remote call. The caller's
    /// credential, if any, is forwarded on every remote call.
    #[tracing::instrument(
        skip(self, request, credential),
        fields(user_id = %request.user_id, items = request.items.len())
    )]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        credential: Option<&Credential>,
    ) -> Result<Order> {
        let started = Instant::now();
        let result = self.try_create_order(request, credential).await;
        self.metrics
            .creation_finished(started.elapsed(), result.is_ok());
        result
    }

    async fn try_create_order(
        &self,
        request: CreateOrderRequest,
        credential: Option<&Credential>,
    ) -> Result<Order> {
        let (shipping_address, items) = validate(&request)?;

        let user_id = request.user_id;
        let user = self
            .bounded(
                RemoteService::Directory,
                self.directory.get_user(user_id, credential),
            )
            .await
            .map_err(|e| {
                OrderingError::from_remote(RemoteService::Directory, e, || {
                    OrderingError::UserNotFound(user_id)
                })
            })?
            .ok_or(OrderingError::UserNotFound(user_id))?;
        tracing::debug!(user_id = %user.id, "user resolved");

        let mut deductions = Vec::with_capacity(items.len());
        match self
            .price_and_persist(user_id, shipping_address, &items, credential, &mut deductions)
            .await
        {
            Ok(order) => {
                self.metrics.order_created(order.status());
                tracing::info!(
                    order_id = %order.id(),
                    total = %order.total_amount(),
                    items = order.item_count(),
                    "order created"
                );
                Ok(order)
            }
            Err(err) => {
                self.settle_deductions(&deductions, credential).await;
                Err(err)
            }
        }
    }

    async fn price_and_persist(
        &self,
        user_id: UserId,
        shipping_address: ShippingAddress,
        items: &[(ProductId, Quantity)],
        credential: Option<&Credential>,
        deductions: &mut Vec<Deduction>,
    ) -> Result<Order> {
        let mut lines = Vec::with_capacity(items.len());
        let mut running_total = Money::zero();

        for &(product_id, quantity) in items {
            let (line, deduction) = self.price_and_deduct(product_id, quantity, credential).await?;
            deductions.push(deduction);
            running_total = running_total
                .checked_add(line.subtotal())
                .ok_or_else(|| unusable_price(product_id, "order total overflows"))?;
            lines.push(line);
        }

        let draft = OrderDraft::new(user_id, shipping_address, lines, Utc::now())?;
        debug_assert_eq!(draft.total_amount(), running_total);

        Ok(self.repository.insert(draft).await?)
    }

    /// Checks one product's stock, snapshots its name and price, and writes
    /// back the reduced stock.
    async fn price_and_deduct(
        &self,
        product_id: ProductId,
        quantity: Quantity,
        credential: Option<&Credential>,
    ) -> Result<(OrderLine, Deduction)> {
        let product = self
            .bounded(
                RemoteService::Inventory,
                self.inventory.get_product(product_id, credential),
            )
            .await
            .map_err(|e| {
                OrderingError::from_remote(RemoteService::Inventory, e, || {
                    OrderingError::ProductNotFound(product_id)
                })
            })?
            .ok_or(OrderingError::ProductNotFound(product_id))?;

        let requested = i64::from(quantity.get());
        let available = match product.stock {
            Some(stock) if stock >= requested => stock,
            other => {
                return Err(OrderingError::InsufficientStock {
                    product_id,
                    requested: quantity.get(),
                    available: other,
                });
            }
        };

        // Checked before the stock write so an unusable price deducts nothing.
        let line = OrderLine::new(product_id, product.name, quantity, product.price)
            .map_err(|_| unusable_price(product_id, "line subtotal overflows"))?;
        let new_stock = available - requested;

        self.bounded(
            RemoteService::Inventory,
            self.inventory.set_stock(product_id, new_stock, credential),
        )
        .await
        .map_err(|e| {
            // The stock write only answers ok or unavailable.
            OrderingError::from_remote(RemoteService::Inventory, e, || {
                OrderingError::UpstreamUnavailable {
                    service: RemoteService::Inventory,
                    reason: format!("product {product_id} vanished during stock update"),
                }
            })
        })?;
        tracing::debug!(%product_id, old = available, new = new_stock, "stock deducted");

        Ok((
            line,
            Deduction {
                product_id,
                previous: available,
                new_stock,
            },
        ))
    }

    /// Applies the compensation policy to deductions issued before a failure.
    async fn settle_deductions(&self, deductions: &[Deduction], credential: Option<&Credential>) {
        if deductions.is_empty() {
            return;
        }

        match self.config.compensation {
            StockCompensation::None => {
                for deduction in deductions {
                    tracing::warn!(
                        product_id = %deduction.product_id,
                        previous = deduction.previous,
                        current = deduction.new_stock,
                        "stock deduction left in place after failed order"
                    );
                }
            }
            StockCompensation::Restore => {
                for deduction in deductions.iter().rev() {
                    let restored = self
                        .bounded(
                            RemoteService::Inventory,
                            self.inventory
                                .set_stock(deduction.product_id, deduction.previous, credential),
                        )
                        .await;
                    match restored {
                        Ok(()) => tracing::info!(
                            product_id = %deduction.product_id,
                            stock = deduction.previous,
                            "stock restored after failed order"
                        ),
                        Err(e) => tracing::warn!(
                            product_id = %deduction.product_id,
                            stock = deduction.previous,
                            error = %e,
                            "stock restore failed"
                        ),
                    }
                }
            }
        }
    }

    /// Bounds a remote call by the configured timeout.
    async fn bounded<T, F>(&self, service: RemoteService, call: F) -> clients::Result<T>
    where
        F: Future<Output = clients::Result<T>>,
    {
        let limit = self.config.remote_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Unavailable(format!(
                "{service} did not answer within {}ms",
                limit.as_millis()
            ))),
        }
    }

    /// Loads one order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<OrderView> {
        Ok(self.load(id).await?.to_view())
    }

    /// Lists every order.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderView>> {
        Ok(views(self.repository.list().await?))
    }

    /// Lists the orders owned by a user. Unknown users yield an empty list.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderView>> {
        Ok(views(self.repository.find_by_user(user_id).await?))
    }

    /// Lists the orders in the status named by `status`.
    #[tracing::instrument(skip(self))]
    pub async fn orders_with_status(&self, status: &str) -> Result<Vec<OrderView>> {
        let status: OrderStatus = status.parse()?;
        Ok(views(self.repository.find_by_status(status).await?))
    }

    /// Moves an order to the status named by `requested`.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, requested: &str) -> Result<OrderView> {
        let mut order = self.load(id).await?;
        let change = order.transition(requested, Utc::now())?;
        self.repository.save_status(&order).await?;

        self.metrics.status_changed(change.from, change.to);
        tracing::info!(order_id = %id, from = %change.from, to = %change.to, "order status changed");
        Ok(order.to_view())
    }

    /// Deletes an order and its line items. Orders in a terminal status are kept.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<()> {
        let order = self.load(id).await?;
        order.ensure_deletable()?;

        if !self.repository.delete(id).await? {
            return Err(OrderingError::OrderNotFound(id));
        }
        tracing::info!(order_id = %id, status = %order.status(), "order deleted");
        Ok(())
    }

    /// Recomputes the total amount of orders created since midnight UTC and
    /// reports it to the metrics sink.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_amount_today(&self) -> Result<Money> {
        let start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let amount = self
            .repository
            .sum_total_between(start, start + Duration::days(1))
            .await?;
        self.metrics.amount_today(amount);
        Ok(amount)
    }

    /// Checks the order store and both remote services.
    pub async fn upstream_status(&self) -> UpstreamStatus {
        let limit = self.config.remote_timeout;
        let (database, directory, inventory) = tokio::join!(
            tokio::time::timeout(limit, self.repository.ping()),
            tokio::time::timeout(limit, self.directory.is_available()),
            tokio::time::timeout(limit, self.inventory.is_available()),
        );
        let database = match database {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "order store ping failed");
                false
            }
            Err(_) => false,
        };
        UpstreamStatus {
            database,
            directory: directory.unwrap_or(false),
            inventory: inventory.unwrap_or(false),
        }
    }

    async fn load(&self, id: OrderId) -> Result<Order> {
        self.repository
            .get(id)
            .await?
            .ok_or(OrderingError::OrderNotFound(id))
    }
}

/// Checks everything that can be checked without a remote call.
fn validate(request: &CreateOrderRequest) -> Result<(ShippingAddress, Vec<(ProductId, Quantity)>)> {
    if request.items.is_empty() {
        return Err(OrderingError::ValidationFailed(domain::OrderError::NoItems));
    }
    let items = request
        .items
        .iter()
        .map(|item| Ok((item.product_id, Quantity::new(item.quantity)?)))
        .collect::<Result<Vec<_>>>()?;
    let shipping_address = ShippingAddress::new(request.shipping_address.clone())?;
    Ok((shipping_address, items))
}

/// A price the inventory service returned that cannot be used for exact totals.
fn unusable_price(product_id: ProductId, reason: &str) -> OrderingError {
    tracing::warn!(%product_id, reason, "unusable price from inventory");
    OrderingError::UpstreamUnavailable {
        service: RemoteService::Inventory,
        reason: format!("price of product {product_id} is unusable: {reason}"),
    }
}

fn views(orders: Vec<Order>) -> Vec<OrderView> {
    orders.iter().map(Order::to_view).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::OrderLineRequest;

    fn request(items: Vec<OrderLineRequest>, address: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            user_id: UserId::new(1),
            shipping_address: address.to_string(),
            items,
        }
    }

    #[test]
    fn test_validate_rejects_empty_items() {
        let err = validate(&request(vec![], "somewhere")).unwrap_err();
        assert!(matches!(
            err,
            OrderingError::ValidationFailed(domain::OrderError::NoItems)
        ));
    }

    #[test]
    fn test_validate_rejects_zero_and_negative_quantities() {
        for quantity in [0, -3] {
            let err = validate(&request(
                vec![OrderLineRequest::new(ProductId::new(1), quantity)],
                "somewhere",
            ))
            .unwrap_err();
            assert_eq!(err.code(), "VALIDATION_FAILED");
        }
    }

    #[test]
    fn test_validate_rejects_blank_and_long_addresses() {
        let items = vec![OrderLineRequest::new(ProductId::new(1), 1)];
        assert!(validate(&request(items.clone(), "  ")).is_err());
        assert!(validate(&request(items.clone(), &"x".repeat(301))).is_err());
        assert!(validate(&request(items, &"x".repeat(300))).is_ok());
    }

    #[test]
    fn test_validate_keeps_request_order() {
        let (_, items) = validate(&request(
            vec![
                OrderLineRequest::new(ProductId::new(3), 1),
                OrderLineRequest::new(ProductId::new(1), 2),
            ],
            "somewhere",
        ))
        .unwrap();
        assert_eq!(items[0].0, ProductId::new(3));
        assert_eq!(items[1].0, ProductId::new(1));
    }
}
