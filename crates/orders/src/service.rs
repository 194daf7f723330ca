use std::sync::Arc;

use bus::MessageBus;
use cache::{CacheKey, CacheStore, CacheStoreExt};
use common::ProductId;
use domain::{DomainEvent, Order, validate_order_qty};
use store::OrderStore;

use crate::{OrderError, ProductDirectory, Result};

/// Records orders and announces them for stock reconciliation.
///
/// Placing an order never touches stock; the `order.created` event it
/// publishes is what eventually takes a unit off the product. Orders are
/// accepted even when the product is out of stock.
#[derive(Clone)]
pub struct OrderRecorder {
    store: Arc<dyn OrderStore>,
    products: Arc<dyn ProductDirectory>,
    cache: Arc<dyn CacheStore>,
    bus: Arc<dyn MessageBus>,
}

impl OrderRecorder {
    pub fn new(
        store: Arc<dyn OrderStore>,
        products: Arc<dyn ProductDirectory>,
        cache: Arc<dyn CacheStore>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        Self {
            store,
            products,
            cache,
            bus,
        }
    }

    /// Records an order for `qty` units of an existing product.
    ///
    /// The total is priced from the product as currently listed. A publish
    /// failure is returned as [`OrderError::Bus`]; the order stays recorded.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, product_id: ProductId, qty: i64) -> Result<Order> {
        let qty = validate_order_qty(qty)?;
        let product = self
            .products
            .find_product(product_id)
            .await?
            .ok_or(OrderError::ProductNotFound(product_id))?;

        let order = self
            .store
            .create_order(Order::place(product_id, product.price, qty))
            .await?;
        self.cache.invalidate(&[CacheKey::Orders]).await;

        let event = DomainEvent::from(order.placed_event());
        self.bus
            .publish(event.event_type(), event.encode_payload()?)
            .await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total_price = %order.total_price, "order created");
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_all_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.find_orders().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_orders_for_product(&self, product_id: ProductId) -> Result<Vec<Order>> {
        Ok(self.store.find_orders_for_product(product_id).await?)
    }

    /// Drops the cached order list, then deletes every order.
    ///
    /// The two steps are not transactional. A store failure after the
    /// invalidation leaves the orders in place with no cached list.
    #[tracing::instrument(skip(self))]
    pub async fn delete_all_orders(&self) -> Result<u64> {
        self.cache.invalidate(&[CacheKey::Orders]).await;
        let deleted = self.store.delete_orders().await?;
        tracing::info!(deleted, "orders deleted");
        Ok(deleted)
    }
}
