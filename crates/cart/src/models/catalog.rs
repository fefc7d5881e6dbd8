//! Catalog types owned by the remote catalog.

use petshop_core::{CategoryId, Price, ProductId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub image_url: Option<String>,
}

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    /// Units available; informational only, the cart does not reserve stock.
    pub stock: u32,
    pub category: CategoryId,
    pub image_url: Option<String>,
    pub description: Option<String>,
}
