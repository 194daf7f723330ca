pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{OrderId, ProductId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{OrderStore, ProductStore, StockDecrement};
