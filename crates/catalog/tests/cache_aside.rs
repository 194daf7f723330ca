//! Cache-aside behavior of the product catalog.

use std::sync::Arc;

use bus::{InMemoryBus, MessageBus, Topology};
use cache::{CacheKey, CacheStore, InMemoryCache};
use catalog::{CatalogError, ProductCatalog};
use common::ProductId;
use domain::{Decimal, DomainEvent, NewProduct, ValidationError};
use store::{InMemoryStore, ProductStore};

const PRODUCT_QUEUE: &str = Topology::PRODUCT_CREATED_QUEUE;

async fn setup() -> (ProductCatalog, InMemoryStore, InMemoryCache, InMemoryBus) {
    let store = InMemoryStore::new();
    let cache = InMemoryCache::new();
    let bus = InMemoryBus::new();
    bus.declare(&Topology::events()).await.unwrap();

    let catalog = ProductCatalog::new(
        Arc::new(store.clone()),
        Arc::new(cache.clone()),
        Arc::new(bus.clone()),
    );
    (catalog, store, cache, bus)
}

fn widget() -> NewProduct {
    NewProduct::new("Widget", Decimal::new(1999, 2), 3)
}

#[tokio::test]
async fn repeated_lookup_reads_store_once() {
    let (catalog, store, cache, _bus) = setup().await;
    let product = catalog.create_product(widget()).await.unwrap();

    let first = catalog.get_product_by_id(product.id).await.unwrap();
    let second = catalog.get_product_by_id(product.id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.product_reads(), 1);
    assert_eq!(cache.hits(), 1);
}

#[tokio::test]
async fn cache_hit_keeps_every_price_digit() {
    let (catalog, store, _cache, _bus) = setup().await;
    let price: Decimal = "1234567890.123456789".parse().unwrap();
    let product = catalog
        .create_product(NewProduct::new("Ledger", price, 1))
        .await
        .unwrap();

    let miss = catalog.get_product_by_id(product.id).await.unwrap();
    let hit = catalog.get_product_by_id(product.id).await.unwrap();
    assert_eq!(store.product_reads(), 1);
    assert_eq!(miss, hit);
    assert_eq!(hit.price.to_string(), "1234567890.123456789");

    catalog.get_all_products().await.unwrap();
    let listed = catalog.get_all_products().await.unwrap();
    assert_eq!(listed, vec![product]);
}

#[tokio::test]
async fn list_is_cached_until_a_create() {
    let (catalog, store, cache, _bus) = setup().await;
    catalog.create_product(widget()).await.unwrap();

    assert_eq!(catalog.get_all_products().await.unwrap().len(), 1);
    assert_eq!(catalog.get_all_products().await.unwrap().len(), 1);
    assert_eq!(store.product_reads(), 1);

    catalog
        .create_product(NewProduct::new("Gadget", Decimal::ONE, 1))
        .await
        .unwrap();
    assert!(!cache.contains(&CacheKey::Products).await);

    assert_eq!(catalog.get_all_products().await.unwrap().len(), 2);
    assert_eq!(store.product_reads(), 2);
}

#[tokio::test]
async fn missing_product_is_not_found_and_not_cached() {
    let (catalog, _store, cache, _bus) = setup().await;
    let id = ProductId::new();

    let result = catalog.get_product_by_id(id).await;
    assert!(matches!(result, Err(CatalogError::NotFound(missing)) if missing == id));
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn invalid_input_writes_nothing() {
    let (catalog, store, cache, bus) = setup().await;
    cache.set(&CacheKey::Products, "[]".to_string()).await.unwrap();

    let inputs = [
        NewProduct::new("   ", Decimal::ONE, 1),
        NewProduct::new("Widget", Decimal::new(-1, 2), 1),
        NewProduct::new("Widget", Decimal::ONE, -1),
        NewProduct::new("Widget", Decimal::ONE, i64::from(i32::MAX) + 1),
    ];
    for input in inputs {
        let result = catalog.create_product(input).await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    assert!(store.find_products().await.unwrap().is_empty());
    assert!(cache.contains(&CacheKey::Products).await);
    assert_eq!(bus.ready_count(PRODUCT_QUEUE).await, 0);
}

#[tokio::test]
async fn empty_name_reports_which_rule_failed() {
    let (catalog, _store, _cache, _bus) = setup().await;
    let result = catalog
        .create_product(NewProduct::new("", Decimal::ONE, 1))
        .await;
    assert!(matches!(
        result,
        Err(CatalogError::Validation(ValidationError::EmptyName))
    ));
}

#[tokio::test]
async fn create_publishes_the_stored_record() {
    let (catalog, _store, _cache, bus) = setup().await;
    let product = catalog.create_product(widget()).await.unwrap();

    let delivery = bus.receive(PRODUCT_QUEUE, "test").await.unwrap();
    let event = DomainEvent::decode(&delivery.routing_key, &delivery.payload).unwrap();
    assert_eq!(event, DomainEvent::ProductCreated(product));
}

#[tokio::test]
async fn published_price_is_exact() {
    let (catalog, _store, _cache, bus) = setup().await;
    let price: Decimal = "0.000000000000000001".parse().unwrap();
    let product = catalog
        .create_product(NewProduct::new("Grain", price, 1))
        .await
        .unwrap();

    let delivery = bus.receive(PRODUCT_QUEUE, "test").await.unwrap();
    let DomainEvent::ProductCreated(announced) =
        DomainEvent::decode(&delivery.routing_key, &delivery.payload).unwrap()
    else {
        panic!("expected a product event");
    };
    assert_eq!(announced.price, product.price);
    assert_eq!(announced.price.to_string(), "0.000000000000000001");
}

#[tokio::test]
async fn publish_failure_fails_the_call_but_keeps_the_product() {
    let (catalog, store, _cache, bus) = setup().await;
    bus.set_publish_failure(true);

    let result = catalog.create_product(widget()).await;
    assert!(matches!(result, Err(CatalogError::Bus(_))));
    assert_eq!(store.find_products().await.unwrap().len(), 1);
}

#[tokio::test]
async fn store_failure_leaves_cache_alone() {
    let (catalog, store, cache, _bus) = setup().await;
    cache.set(&CacheKey::Products, "[]".to_string()).await.unwrap();
    store.set_unavailable(true);

    let result = catalog.create_product(widget()).await;
    assert!(matches!(result, Err(CatalogError::Store(_))));
    assert!(cache.contains(&CacheKey::Products).await);
}

#[tokio::test]
async fn cache_outage_falls_back_to_store() {
    let (catalog, store, cache, _bus) = setup().await;
    let product = catalog.create_product(widget()).await.unwrap();
    cache.set_unavailable(true);

    assert_eq!(catalog.get_product_by_id(product.id).await.unwrap(), product);
    assert_eq!(catalog.get_all_products().await.unwrap(), vec![product]);
    assert_eq!(store.product_reads(), 2);
}

#[tokio::test]
async fn create_survives_cache_outage() {
    let (catalog, store, cache, _bus) = setup().await;
    cache.set_unavailable(true);

    catalog.create_product(widget()).await.unwrap();
    assert_eq!(store.find_products().await.unwrap().len(), 1);
}

#[tokio::test]
async fn undecodable_cache_entry_counts_as_miss() {
    let (catalog, store, cache, _bus) = setup().await;
    let product = catalog.create_product(widget()).await.unwrap();
    cache
        .set(&CacheKey::Product(product.id), "{garbage".to_string())
        .await
        .unwrap();

    assert_eq!(catalog.get_product_by_id(product.id).await.unwrap(), product);
    assert_eq!(store.product_reads(), 1);

    // The miss rewrote the entry, so the next read is a hit.
    catalog.get_product_by_id(product.id).await.unwrap();
    assert_eq!(store.product_reads(), 1);
}

#[tokio::test]
async fn uncached_variants_bypass_the_cache() {
    let (catalog, store, cache, bus) = setup().await;
    catalog.create_product(widget()).await.unwrap();
    catalog.get_all_products().await.unwrap();

    let gadget = catalog
        .create_product_without_cache(NewProduct::new("Gadget", Decimal::ONE, 1))
        .await
        .unwrap();

    // The cached list was not invalidated and is now stale.
    assert_eq!(catalog.get_all_products().await.unwrap().len(), 1);

    let fresh = catalog.get_all_products_without_cache().await.unwrap();
    assert_eq!(fresh.len(), 2);
    assert!(fresh.contains(&gadget));
    assert_eq!(store.product_reads(), 2);
    assert_eq!(cache.len().await, 1);

    // Both creates were announced.
    assert_eq!(bus.ready_count(PRODUCT_QUEUE).await, 2);
}

#[tokio::test]
async fn uncached_create_still_validates() {
    let (catalog, store, _cache, _bus) = setup().await;
    let result = catalog
        .create_product_without_cache(NewProduct::new("", Decimal::ONE, 1))
        .await;
    assert!(matches!(result, Err(CatalogError::Validation(_))));
    assert!(store.find_products().await.unwrap().is_empty());
}
