use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::{CacheKey, Result};

/// A TTL-less key/value cache holding serialized snapshots.
///
/// Implementations must be thread-safe (Send + Sync); one handle is shared by
/// every component in the process.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads the raw value under `key`.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>>;

    /// Overwrites the value under `key`.
    async fn set(&self, key: &CacheKey, value: String) -> Result<()>;

    /// Removes `key`, returning whether it existed.
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
}

/// JSON and invalidation helpers available on every [`CacheStore`].
#[async_trait]
pub trait CacheStoreExt: CacheStore {
    /// Reads and decodes the value under `key`.
    async fn get_json<T>(&self, key: &CacheKey) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encodes `value` and stores it under `key`.
    async fn set_json<T>(&self, key: &CacheKey, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw).await
    }

    /// Deletes every key in `keys`, logging failures instead of returning them.
    ///
    /// Keeps going after a failed delete so one bad key does not leave the
    /// others stale.
    async fn invalidate(&self, keys: &[CacheKey]) {
        for key in keys {
            if let Err(e) = self.delete(key).await {
                tracing::warn!(%key, error = %e, "cache invalidation failed");
            }
        }
    }
}

impl<S: CacheStore + ?Sized> CacheStoreExt for S {}
