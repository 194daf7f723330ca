//! Product catalog service.
//!
//! [`ProductCatalog`] serves product reads through the cache and keeps the
//! cache coherent on writes. [`StockReconciler`] consumes `order.created`
//! events and takes stock off the referenced product, invalidating every
//! cached view of it.

pub mod error;
pub mod reconciler;
pub mod service;

pub use error::{CatalogError, Result};
pub use reconciler::{ReconciliationOutcome, ReconciliationPolicy, StockReconciler};
pub use service::ProductCatalog;
