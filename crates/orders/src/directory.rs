use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use domain::Product;
use store::ProductStore;
use thiserror::Error;

/// The product lookup failed for a reason other than absence.
#[derive(Debug, Error)]
#[error("Product lookup failed: {0}")]
pub struct DirectoryError(pub String);

/// Where the order service looks products up before accepting an order.
#[async_trait]
pub trait ProductDirectory: Send + Sync {
    /// Returns the product, or `None` when no such product exists.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, DirectoryError>;
}

/// Reads products directly from a shared product store.
#[derive(Clone)]
pub struct StoreDirectory {
    store: Arc<dyn ProductStore>,
}

impl StoreDirectory {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProductDirectory for StoreDirectory {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, DirectoryError> {
        self.store
            .find_product(id)
            .await
            .map_err(|e| DirectoryError(e.to_string()))
    }
}
