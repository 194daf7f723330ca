//! Redis cache integration tests
//!
//! Run with:
//!
//! ```bash
//! cargo test -p cache --features redis --test redis_integration
//! ```

use cache::{CacheError, CacheKey, CacheStore, CacheStoreExt, RedisCache};
use common::ProductId;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;

async fn start() -> (ContainerAsync<Redis>, RedisCache) {
    let container = Redis::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(6379).await.unwrap();

    let cache = RedisCache::connect(&format!("redis://{}:{}", host, port))
        .await
        .unwrap();
    (container, cache)
}

#[tokio::test]
async fn set_get_delete() {
    let (_container, cache) = start().await;
    let key = CacheKey::Product(ProductId::new());

    assert!(cache.get(&key).await.unwrap().is_none());

    cache.set_json(&key, &vec!["Widget"]).await.unwrap();
    let cached: Option<Vec<String>> = cache.get_json(&key).await.unwrap();
    assert_eq!(cached, Some(vec!["Widget".to_string()]));

    assert!(cache.delete(&key).await.unwrap());
    assert!(!cache.delete(&key).await.unwrap());
}

#[tokio::test]
async fn invalidate_clears_product_views() {
    let (_container, cache) = start().await;
    let id = ProductId::new();
    for key in CacheKey::product_views(id) {
        cache.set(&key, "{}".to_string()).await.unwrap();
    }

    cache.invalidate(&CacheKey::product_views(id)).await;

    assert!(cache.get(&CacheKey::Product(id)).await.unwrap().is_none());
    assert!(cache.get(&CacheKey::Products).await.unwrap().is_none());
}

#[tokio::test]
async fn garbage_value_fails_to_decode() {
    let (_container, cache) = start().await;
    cache
        .set(&CacheKey::Orders, "{broken".to_string())
        .await
        .unwrap();

    let result = cache.get_json::<Vec<String>>(&CacheKey::Orders).await;
    assert!(matches!(result, Err(CacheError::Serialization(_))));
}
