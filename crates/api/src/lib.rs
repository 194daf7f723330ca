//! HTTP API server for the catalog and order services.
//!
//! Wires the process-scoped [`Resources`] into the catalog, order and
//! reconciliation components and exposes them over REST, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod resources;
pub mod routes;

use async_trait::async_trait;
use axum::Router;
use axum::routing::get;
use catalog::{CatalogError, ProductCatalog, ReconciliationPolicy, StockReconciler};
use common::ProductId;
use domain::Product;
use metrics_exporter_prometheus::PrometheusHandle;
use orders::{DirectoryError, OrderRecorder, ProductDirectory};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use resources::{ResourceError, Resources};

/// Shared application state accessible from all handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: ProductCatalog,
    pub orders: OrderRecorder,
}

/// Product lookups for the order service, served through the catalog's
/// cache the same way an HTTP client of the catalog would see them.
#[derive(Clone)]
pub struct CatalogDirectory {
    catalog: ProductCatalog,
}

impl CatalogDirectory {
    pub fn new(catalog: ProductCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ProductDirectory for CatalogDirectory {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, DirectoryError> {
        match self.catalog.get_product_by_id(id).await {
            Ok(product) => Ok(Some(product)),
            Err(CatalogError::NotFound(_)) => Ok(None),
            Err(e) => Err(DirectoryError(e.to_string())),
        }
    }
}

/// Builds the services on top of `resources`.
///
/// Returns the HTTP state plus the stock reconciler, whose workers the
/// caller spawns.
pub fn create_services(
    resources: &Resources,
    policy: ReconciliationPolicy,
) -> (AppState, StockReconciler) {
    let catalog = ProductCatalog::new(
        resources.products.clone(),
        resources.cache.clone(),
        resources.bus.clone(),
    );
    let orders = OrderRecorder::new(
        resources.orders.clone(),
        Arc::new(CatalogDirectory::new(catalog.clone())),
        resources.cache.clone(),
        resources.bus.clone(),
    );
    let reconciler = StockReconciler::new(
        resources.products.clone(),
        resources.cache.clone(),
        resources.bus.clone(),
    )
    .with_policy(policy);

    (AppState { catalog, orders }, reconciler)
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route(
            "/products",
            get(routes::products::list).post(routes::products::create),
        )
        .route(
            "/products/uncached",
            get(routes::products::list_uncached).post(routes::products::create_uncached),
        )
        .route("/products/{id}", get(routes::products::get))
        .route(
            "/orders",
            get(routes::orders::list)
                .post(routes::orders::create)
                .delete(routes::orders::delete_all),
        )
        .route("/orders/product/{product_id}", get(routes::orders::for_product))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
