//! Cache-aside reads and cache-invalidating writes for products.

use std::sync::Arc;

use bus::MessageBus;
use cache::{CacheKey, CacheStore, CacheStoreExt};
use common::ProductId;
use domain::{DomainEvent, NewProduct, Product};
use store::ProductStore;

use crate::{CatalogError, Result};

/// Product reads and writes with a read-through cache in front of the store.
///
/// Reads fill the cache on a miss. Writes delete every cache key the new
/// state could make stale, then publish a `product.created` event. The cache
/// is never allowed to fail an operation: read errors count as misses and
/// write errors are logged.
#[derive(Clone)]
pub struct ProductCatalog {
    store: Arc<dyn ProductStore>,
    cache: Arc<dyn CacheStore>,
    bus: Arc<dyn MessageBus>,
}

impl ProductCatalog {
    pub fn new(
        store: Arc<dyn ProductStore>,
        cache: Arc<dyn CacheStore>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        Self { store, cache, bus }
    }

    /// Validates and stores a product, drops the cached list and announces it.
    ///
    /// A publish failure is returned as [`CatalogError::Bus`]; the product
    /// stays created.
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        let product = self.store.create_product(input.into_product()?).await?;
        self.cache.invalidate(&[CacheKey::Products]).await;
        self.announce(&product).await?;

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_all_products(&self) -> Result<Vec<Product>> {
        let key = CacheKey::Products;
        if let Some(products) = self.cached::<Vec<Product>>(&key).await {
            return Ok(products);
        }

        let products = self.store.find_products().await?;
        self.fill(&key, &products).await;
        Ok(products)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product_by_id(&self, id: ProductId) -> Result<Product> {
        let key = CacheKey::Product(id);
        if let Some(product) = self.cached::<Product>(&key).await {
            return Ok(product);
        }

        let product = self
            .store
            .find_product(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;
        self.fill(&key, &product).await;
        Ok(product)
    }

    /// Reads straight from the store without touching the cache.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_products_without_cache(&self) -> Result<Vec<Product>> {
        Ok(self.store.find_products().await?)
    }

    /// Stores a product without touching the cache. Still validates and
    /// still publishes `product.created`.
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product_without_cache(&self, input: NewProduct) -> Result<Product> {
        let product = self.store.create_product(input.into_product()?).await?;
        self.announce(&product).await?;
        Ok(product)
    }

    async fn announce(&self, product: &Product) -> Result<()> {
        let event = DomainEvent::from(product.clone());
        let payload = event.encode_payload()?;
        self.bus.publish(event.event_type(), payload).await?;
        Ok(())
    }

    async fn cached<T>(&self, key: &CacheKey) -> Option<T>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        match self.cache.get_json::<T>(key).await {
            Ok(Some(value)) => {
                metrics::counter!("catalog_cache_hits_total").increment(1);
                tracing::debug!(%key, "cache hit");
                return Some(value);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(%key, error = %e, "cache read failed, using store"),
        }
        metrics::counter!("catalog_cache_misses_total").increment(1);
        None
    }

    async fn fill<T>(&self, key: &CacheKey, value: &T)
    where
        T: serde::Serialize + Sync,
    {
        if let Err(e) = self.cache.set_json(key, value).await {
            tracing::warn!(%key, error = %e, "cache fill failed");
        }
    }
}
