use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use domain::{Order, Product};
use tokio::sync::RwLock;

use crate::{
    OrderId, ProductId, Result, StoreError,
    store::{OrderStore, ProductStore, StockDecrement},
};

#[derive(Default)]
struct MemoryState {
    products: Vec<Product>,
    orders: Vec<Order>,
    processed_orders: HashSet<OrderId>,
}

/// In-memory store implementation for testing and single-process runs.
///
/// Every mutation happens under one write lock, which gives the conditional
/// decrement the same atomicity as the PostgreSQL `UPDATE … WHERE`.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
    product_reads: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of product read operations served so far.
    pub fn product_reads(&self) -> u64 {
        self.product_reads.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of orders recorded in the processed-orders ledger.
    pub async fn processed_count(&self) -> usize {
        self.state.read().await.processed_orders.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn take_one(products: &mut [Product], id: ProductId) -> u64 {
        match products.iter_mut().find(|p| p.id == id) {
            Some(product) if product.quantity > 0 => {
                product.quantity -= 1;
                1
            }
            _ => 0,
        }
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn create_product(&self, product: Product) -> Result<Product> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if state.products.iter().any(|p| p.id == product.id) {
            return Err(StoreError::DuplicateKey(format!("product {}", product.id)));
        }
        state.products.push(product.clone());
        Ok(product)
    }

    async fn find_products(&self) -> Result<Vec<Product>> {
        self.check_available()?;
        self.product_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.read().await.products.clone())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        self.check_available()?;
        self.product_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn decrement_stock(&self, id: ProductId) -> Result<u64> {
        self.check_available()?;
        let mut state = self.state.write().await;
        Ok(Self::take_one(&mut state.products, id))
    }

    async fn decrement_stock_once(
        &self,
        id: ProductId,
        order_id: OrderId,
    ) -> Result<StockDecrement> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if !state.processed_orders.insert(order_id) {
            return Ok(StockDecrement::AlreadyProcessed);
        }
        match Self::take_one(&mut state.products, id) {
            1 => Ok(StockDecrement::Applied),
            _ => Ok(StockDecrement::NotApplied),
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create_order(&self, order: Order) -> Result<Order> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if state.orders.iter().any(|o| o.id == order.id) {
            return Err(StoreError::DuplicateKey(format!("order {}", order.id)));
        }
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn find_orders(&self) -> Result<Vec<Order>> {
        self.check_available()?;
        Ok(self.state.read().await.orders.clone())
    }

    async fn find_orders_for_product(&self, product_id: ProductId) -> Result<Vec<Order>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .filter(|o| o.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn delete_orders(&self) -> Result<u64> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let removed = state.orders.len() as u64;
        state.orders.clear();
        Ok(removed)
    }
}
