use async_trait::async_trait;
use domain::{Order, Product};

use crate::{OrderId, ProductId, Result};

/// Outcome of a deduplicated stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecrement {
    /// The order was recorded as processed and one unit was taken.
    Applied,
    /// The order was recorded as processed but no row matched: the product
    /// is missing or already at zero.
    NotApplied,
    /// The order had already been processed; nothing changed.
    AlreadyProcessed,
}

/// Durable storage for catalog products.
///
/// Implementations must be thread-safe (Send + Sync) and are shared across
/// request handlers and reconciliation workers.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Inserts a new product and returns the stored record.
    async fn create_product(&self, product: Product) -> Result<Product>;

    /// Returns every product, oldest first.
    async fn find_products(&self) -> Result<Vec<Product>>;

    /// Looks up a single product.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Takes one unit of stock from a product if it has any.
    ///
    /// Equivalent to
    /// `UPDATE products SET quantity = quantity - 1 WHERE id = $1 AND quantity > 0`
    /// executed as a single atomic operation. Returns the number of rows
    /// affected: `1` when a unit was taken, `0` when the product is missing
    /// or out of stock. Never leaves a quantity below zero.
    async fn decrement_stock(&self, id: ProductId) -> Result<u64>;

    /// Like [`decrement_stock`](Self::decrement_stock), but records
    /// `order_id` in the processed-orders ledger in the same atomic step.
    ///
    /// A second call with the same `order_id` changes nothing and returns
    /// [`StockDecrement::AlreadyProcessed`].
    async fn decrement_stock_once(&self, id: ProductId, order_id: OrderId)
    -> Result<StockDecrement>;
}

/// Durable storage for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order and returns the stored record.
    async fn create_order(&self, order: Order) -> Result<Order>;

    /// Returns every order, oldest first.
    async fn find_orders(&self) -> Result<Vec<Order>>;

    /// Returns the orders referencing `product_id`, oldest first.
    async fn find_orders_for_product(&self, product_id: ProductId) -> Result<Vec<Order>>;

    /// Deletes every order and returns how many were removed.
    async fn delete_orders(&self) -> Result<u64>;
}
