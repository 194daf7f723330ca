//! Order service.
//!
//! [`OrderRecorder`] writes orders, keeps the cached order list coherent and
//! announces each order on the bus for stock reconciliation.

pub mod directory;
pub mod error;
pub mod service;

pub use directory::{DirectoryError, ProductDirectory, StoreDirectory};
pub use error::{OrderError, Result};
pub use service::OrderRecorder;
