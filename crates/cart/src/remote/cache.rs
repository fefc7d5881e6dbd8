//! Cache types for catalog reads.

use petshop_core::ProductId;

use super::ProductQuery;
use crate::models::{Category, Product};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
    Products(ProductQuery),
    Product(ProductId),
}

impl CacheKey {
    /// Key for a product listing, normalized so queries that fetch the
    /// same thing share an entry.
    pub fn products(query: &ProductQuery) -> Self {
        Self::Products(ProductQuery {
            category_id: query.category_id.clone(),
            limit: query.effective_limit(),
        })
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Vec<Category>),
    Products(Vec<Product>),
    Product(Box<Product>),
}
