//! Identifier types shared by the catalog and order services.

pub mod types;

pub use types::{OrderId, ProductId};
