use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{CacheError, CacheKey, Result, store::CacheStore};

/// In-memory cache for tests and single-process runs.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
    unavailable: Arc<AtomicBool>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`CacheError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Whether `key` currently holds a value.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().await.contains_key(&key.to_string())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops every entry, as if the cache had been flushed.
    pub async fn flush(&self) {
        self.entries.write().await.clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable(
                "in-memory cache marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        self.check_available()?;
        let value = self.entries.read().await.get(&key.to_string()).cloned();
        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::SeqCst),
            None => self.misses.fetch_add(1, Ordering::SeqCst),
        };
        Ok(value)
    }

    async fn set(&self, key: &CacheKey, value: String) -> Result<()> {
        self.check_available()?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        self.check_available()?;
        Ok(self.entries.write().await.remove(&key.to_string()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use common::ProductId;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::store::CacheStoreExt;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        name: String,
        quantity: u32,
    }

    #[tokio::test]
    async fn json_round_trip_counts_hits_and_misses() {
        let cache = InMemoryCache::new();
        let key = CacheKey::Product(ProductId::new());

        assert!(cache.get_json::<Snapshot>(&key).await.unwrap().is_none());

        let snapshot = Snapshot {
            name: "Widget".to_string(),
            quantity: 3,
        };
        cache.set_json(&key, &snapshot).await.unwrap();

        let cached: Option<Snapshot> = cache.get_json(&key).await.unwrap();
        assert_eq!(cached, Some(snapshot));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[tokio::test]
    async fn undecodable_value_is_a_serialization_error() {
        let cache = InMemoryCache::new();
        cache
            .set(&CacheKey::Products, "not json".to_string())
            .await
            .unwrap();

        let result = cache.get_json::<Vec<Snapshot>>(&CacheKey::Products).await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let cache = InMemoryCache::new();
        cache.set(&CacheKey::Orders, "[]".to_string()).await.unwrap();

        assert!(cache.delete(&CacheKey::Orders).await.unwrap());
        assert!(!cache.delete(&CacheKey::Orders).await.unwrap());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn invalidate_removes_every_listed_key() {
        let cache = InMemoryCache::new();
        let id = ProductId::new();
        for key in CacheKey::product_views(id) {
            cache.set(&key, "{}".to_string()).await.unwrap();
        }
        cache.set(&CacheKey::Orders, "[]".to_string()).await.unwrap();

        cache.invalidate(&CacheKey::product_views(id)).await;

        assert!(!cache.contains(&CacheKey::Product(id)).await);
        assert!(!cache.contains(&CacheKey::Products).await);
        assert!(cache.contains(&CacheKey::Orders).await);
    }

    #[tokio::test]
    async fn invalidate_swallows_backend_failures() {
        let cache = InMemoryCache::new();
        cache.set(&CacheKey::Products, "[]".to_string()).await.unwrap();
        cache.set_unavailable(true);

        cache.invalidate(&[CacheKey::Products]).await;

        cache.set_unavailable(false);
        assert!(cache.contains(&CacheKey::Products).await);
    }

    #[tokio::test]
    async fn works_through_trait_object() {
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
        cache.set_json(&CacheKey::Orders, &vec![1, 2]).await.unwrap();
        let orders: Option<Vec<i32>> = cache.get_json(&CacheKey::Orders).await.unwrap();
        assert_eq!(orders, Some(vec![1, 2]));
    }
}
