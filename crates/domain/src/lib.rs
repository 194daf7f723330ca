//! Domain layer for the catalog and order services.
//!
//! This crate holds the plain data the services exchange:
//! - [`Product`] and the validated [`NewProduct`] input
//! - [`Order`] records and the [`OrderPlaced`] event payload
//! - [`DomainEvent`], the tagged union of everything published on the bus

pub mod error;
pub mod events;
pub mod order;
pub mod product;

pub use common::{OrderId, ProductId};
pub use error::ValidationError;
pub use events::{DomainEvent, EventDecodeError};
pub use order::{Order, OrderPlaced, OrderStatus, validate_order_qty};
pub use product::{NewProduct, Product};
pub use rust_decimal::Decimal;
