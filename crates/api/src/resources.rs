//! Process-scoped connections to the store, cache and bus.
//!
//! Built once at startup, handed to every component as `Arc<dyn …>` handles
//! and torn down explicitly at shutdown.

use std::sync::Arc;

use bus::{BusError, InMemoryBus, MessageBus, Topology};
use cache::{CacheError, CacheStore, InMemoryCache};
use store::{InMemoryStore, OrderStore, PostgresStore, ProductStore, StoreError};
use thiserror::Error;

use crate::config::Config;

const POSTGRES_MAX_CONNECTIONS: u32 = 10;

/// Startup failures. Any of them aborts the process.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// A backend was configured that this build does not include.
    #[error("{0} support is not compiled in; rebuild with --features {0}")]
    FeatureDisabled(&'static str),
}

/// Shared backend handles.
#[derive(Clone)]
pub struct Resources {
    pub products: Arc<dyn ProductStore>,
    pub orders: Arc<dyn OrderStore>,
    pub cache: Arc<dyn CacheStore>,
    pub bus: Arc<dyn MessageBus>,
    postgres: Option<PostgresStore>,
}

impl Resources {
    /// In-process backends with the bus topology already declared.
    pub async fn in_memory() -> Result<Self, ResourceError> {
        let store = InMemoryStore::new();
        let bus = InMemoryBus::new();
        bus.declare(&Topology::events()).await?;

        Ok(Self {
            products: Arc::new(store.clone()),
            orders: Arc::new(store),
            cache: Arc::new(InMemoryCache::new()),
            bus: Arc::new(bus),
            postgres: None,
        })
    }

    /// Connects every backend named in `config`, falling back to in-memory
    /// ones for anything left unset.
    ///
    /// The bus connection (including topology declaration) is retried per
    /// `config.bus_retry`.
    pub async fn connect(config: &Config) -> Result<Self, ResourceError> {
        let mut resources = Self::in_memory().await?;

        if let Some(url) = &config.database_url {
            let postgres = PostgresStore::connect(url, POSTGRES_MAX_CONNECTIONS).await?;
            postgres.run_migrations().await.map_err(StoreError::from)?;
            tracing::info!("connected to postgres");
            resources.products = Arc::new(postgres.clone());
            resources.orders = Arc::new(postgres.clone());
            resources.postgres = Some(postgres);
        }

        if let Some(url) = &config.redis_url {
            let (cache, bus) = connect_redis(url, config).await?;
            resources.cache = cache;
            resources.bus = bus;
        }

        tracing::info!(
            postgres = resources.postgres.is_some(),
            redis = config.redis_url.is_some(),
            "resources ready"
        );
        Ok(resources)
    }

    /// Closes pooled connections.
    pub async fn shutdown(self) {
        if let Some(postgres) = self.postgres {
            postgres.close().await;
        }
        tracing::info!("resources released");
    }
}

#[cfg(feature = "redis")]
async fn connect_redis(
    url: &str,
    config: &Config,
) -> Result<(Arc<dyn CacheStore>, Arc<dyn MessageBus>), ResourceError> {
    use bus::{RedisStreamsBus, connect_with_retry};
    use cache::RedisCache;

    let cache = RedisCache::connect(url).await?;
    let bus = connect_with_retry(config.bus_retry, "redis-streams", || async {
        let bus = RedisStreamsBus::connect(url).await?;
        bus.declare(&Topology::events()).await?;
        Ok::<_, BusError>(bus)
    })
    .await?;
    Ok((Arc::new(cache), Arc::new(bus)))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(
    _url: &str,
    _config: &Config,
) -> Result<(Arc<dyn CacheStore>, Arc<dyn MessageBus>), ResourceError> {
    Err(ResourceError::FeatureDisabled("redis"))
}
