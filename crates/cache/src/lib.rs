//! Read-through cache for catalog and order views.
//!
//! Entries are plain JSON snapshots with no version and no TTL. The store is
//! the source of truth, so every backend here may lose entries at any time.

pub mod error;
pub mod key;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod store;

pub use error::{CacheError, Result};
pub use key::CacheKey;
pub use memory::InMemoryCache;
#[cfg(feature = "redis")]
pub use crate::redis::RedisCache;
pub use store::{CacheStore, CacheStoreExt};
