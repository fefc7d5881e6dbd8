//! In-process catalog and order service.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use petshop_core::{OrderId, ProductId, UserId};

use super::records::sort_newest_first;
use super::{Catalog, OrderSubmission, ProductQuery, RemoteError};
use crate::models::{Category, Order, OrderDraft, Product};

/// Catalog and order service held in memory.
///
/// Behaves like [`super::RealtimeDbClient`] against a live database:
/// products are listed in key order, category filters ignore the limit,
/// orders get server-assigned ids and come back newest first. Clones share
/// the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRemote {
    inner: Arc<Mutex<MemoryData>>,
}

#[derive(Debug, Default)]
struct MemoryData {
    categories: Vec<Category>,
    products: BTreeMap<ProductId, Product>,
    orders: HashMap<UserId, Vec<Order>>,
    next_order: u64,
    fail_orders: bool,
    fail_catalog: bool,
}

impl InMemoryRemote {
    /// An empty remote.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category.
    pub fn insert_category(&self, category: Category) {
        self.inner.lock().categories.push(category);
    }

    /// Add or replace a product.
    pub fn insert_product(&self, product: Product) {
        self.inner
            .lock()
            .products
            .insert(product.id.clone(), product);
    }

    /// Make every order submission fail with a 503.
    pub fn fail_orders(&self, fail: bool) {
        self.inner.lock().fail_orders = fail;
    }

    /// Make every catalog read fail with a 503.
    pub fn fail_catalog(&self, fail: bool) {
        self.inner.lock().fail_catalog = fail;
    }

    fn unavailable() -> RemoteError {
        RemoteError::Status {
            status: 503,
            body: "Service Unavailable".to_string(),
        }
    }

    fn check_catalog(&self) -> Result<(), RemoteError> {
        if self.inner.lock().fail_catalog {
            Err(Self::unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Catalog for InMemoryRemote {
    async fn list_categories(&self) -> Result<Vec<Category>, RemoteError> {
        self.check_catalog()?;
        Ok(self.inner.lock().categories.clone())
    }

    #[instrument(skip(self))]
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RemoteError> {
        self.check_catalog()?;
        let data = self.inner.lock();
        let products = data.products.values();

        let products: Vec<Product> = match (&query.category_id, query.effective_limit()) {
            (Some(category), _) => products
                .filter(|p| &p.category == category)
                .cloned()
                .collect(),
            (None, Some(limit)) => products
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .cloned()
                .collect(),
            (None, None) => products.cloned().collect(),
        };
        drop(data);

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RemoteError> {
        self.check_catalog()?;
        Ok(self.inner.lock().products.get(id).cloned())
    }
}

#[async_trait]
impl OrderSubmission for InMemoryRemote {
    #[instrument(skip(self, draft), fields(user_id = %draft.user_id))]
    async fn submit_order(&self, draft: OrderDraft) -> Result<Order, RemoteError> {
        if draft.user_id.is_blank() {
            return Err(RemoteError::InvalidRequest(
                "a user id is required to create an order".to_string(),
            ));
        }

        let mut data = self.inner.lock();
        if data.fail_orders {
            return Err(Self::unavailable());
        }

        data.next_order += 1;
        let id = OrderId::new(format!("order-{:06}", data.next_order));
        let order = Order::from_draft(draft, id, Utc::now());
        data.orders
            .entry(order.user_id.clone())
            .or_default()
            .push(order.clone());
        drop(data);

        debug!(order_id = %order.id, "Order stored");
        Ok(order)
    }

    async fn fetch_orders(&self, user_id: &UserId) -> Result<Vec<Order>, RemoteError> {
        if user_id.is_blank() {
            return Ok(Vec::new());
        }

        let mut orders = self
            .inner
            .lock()
            .orders
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        sort_newest_first(&mut orders);
        Ok(orders)
    }
}
