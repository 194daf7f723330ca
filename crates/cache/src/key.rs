use std::fmt;

use common::ProductId;

/// The only keys this system writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full product list.
    Products,
    /// One product snapshot.
    Product(ProductId),
    /// Full order list.
    Orders,
}

impl CacheKey {
    /// Every key that may hold a stale view of `id` after its stock changes.
    pub fn product_views(id: ProductId) -> [CacheKey; 2] {
        [CacheKey::Product(id), CacheKey::Products]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Products => f.write_str("products"),
            CacheKey::Product(id) => write!(f, "product_{id}"),
            CacheKey::Orders => f.write_str("orders"),
        }
    }
}
