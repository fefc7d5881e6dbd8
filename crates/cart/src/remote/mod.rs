//! Remote catalog and order service.
//!
//! # Architecture
//!
//! - The remote database is the source of truth for categories, products
//!   and orders; nothing here is written to the local cart store
//! - [`RealtimeDbClient`] speaks the Firebase Realtime Database REST
//!   dialect over `reqwest`, with catalog reads cached in `moka`
//! - [`InMemoryRemote`] has the same semantics in-process, for tests and
//!   offline demos
//!
//! Both implement [`Catalog`] and [`OrderSubmission`], which is all the
//! rest of the engine depends on.

mod cache;
mod client;
mod memory;
mod records;

pub use client::RealtimeDbClient;
pub use memory::InMemoryRemote;

use async_trait::async_trait;
use thiserror::Error;

use petshop_core::{CategoryId, ProductId, UserId};

use crate::models::{Category, Order, OrderDraft, Product};

/// Errors that can occur when talking to the remote database.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request was rejected before it was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A stored record could not be turned into a domain value.
    #[error("Invalid record {key}: {reason}")]
    InvalidRecord { key: String, reason: String },
}

/// Filter for [`Catalog::list_products`].
///
/// `category_id` and `limit` do not compose: when a category is given the
/// limit is ignored and every product in it is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub category_id: Option<CategoryId>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    /// Every product.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Every product in `category_id`.
    #[must_use]
    pub fn in_category(category_id: impl Into<CategoryId>) -> Self {
        Self {
            category_id: Some(category_id.into()),
            limit: None,
        }
    }

    /// The first `limit` products by key.
    #[must_use]
    pub const fn first(limit: u32) -> Self {
        Self {
            category_id: None,
            limit: Some(limit),
        }
    }

    /// The limit that actually applies.
    #[must_use]
    pub const fn effective_limit(&self) -> Option<u32> {
        match self.category_id {
            Some(_) => None,
            None => self.limit,
        }
    }
}

/// Read-only access to categories and products.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All categories.
    async fn list_categories(&self) -> Result<Vec<Category>, RemoteError>;

    /// Products matching `query`, in key order.
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RemoteError>;

    /// A single product, or `None` if no product has that id.
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RemoteError>;
}

/// Order creation and history.
#[async_trait]
pub trait OrderSubmission: Send + Sync {
    /// Persist an order. The server assigns its id and timestamp.
    ///
    /// A draft without a user id is rejected with
    /// [`RemoteError::InvalidRequest`].
    async fn submit_order(&self, draft: OrderDraft) -> Result<Order, RemoteError>;

    /// A user's orders, most recent first. A blank user id yields an empty
    /// list.
    async fn fetch_orders(&self, user_id: &UserId) -> Result<Vec<Order>, RemoteError>;
}
