//! Redis cache backend.
//!
//! Shares one multiplexed connection across every caller; clones of
//! [`RedisCache`] reuse it.

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};

use crate::{CacheError, CacheKey, Result, store::CacheStore};

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
            CacheError::Unavailable(e.to_string())
        } else {
            CacheError::Backend(e.to_string())
        }
    }
}

/// Redis-backed cache.
#[derive(Clone)]
pub struct RedisCache {
    connection: MultiplexedConnection,
}

impl RedisCache {
    /// Connects to the Redis server at `url` (e.g. `redis://localhost:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        tracing::info!("connected to redis cache");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key.to_string()).await?;
        Ok(value)
    }

    async fn set(&self, key: &CacheKey, value: String) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.set(key.to_string(), value).await?;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let mut conn = self.connection.clone();
        let removed: i64 = conn.del(key.to_string()).await?;
        Ok(removed > 0)
    }
}
