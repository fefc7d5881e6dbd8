//! REST client for the remote realtime database.
//!
//! Catalog reads are cached in `moka` for the configured TTL. Order
//! reads and writes always go to the server.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use petshop_core::{OrderId, ProductId, UserId};

use super::cache::{CacheKey, CacheValue};
use super::records::{
    CategoryRecord, NewOrderRecord, OrderRecord, ProductRecord, PushResponse, convert_all,
    convert_category, convert_order, convert_product, parse_collection, sort_newest_first,
};
use super::{Catalog, OrderSubmission, ProductQuery, RemoteError};
use crate::config::CatalogConfig;
use crate::models::{Category, Order, OrderDraft, Product};

const CACHE_CAPACITY: u64 = 1000;

/// Client for the remote realtime database.
///
/// Cheap to clone; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct RealtimeDbClient {
    inner: Arc<RealtimeDbClientInner>,
}

struct RealtimeDbClientInner {
    client: reqwest::Client,
    base_url: Url,
    auth_token: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl RealtimeDbClient {
    /// Create a new client.
    #[must_use]
    pub fn new(config: &CatalogConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.cache_ttl)
            .build();

        Self {
            inner: Arc::new(RealtimeDbClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                auth_token: config.auth_token.clone(),
                cache,
            }),
        }
    }

    /// Build `{base}/{segments...}.json?{query}&auth=...`.
    ///
    /// Segments are percent-encoded, so ids cannot escape their path.
    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, RemoteError> {
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| RemoteError::InvalidRequest("empty path".to_string()))?;

        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::InvalidRequest("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(parents)
            .push(&format!("{last}.json"));

        if !query.is_empty() || self.inner.auth_token.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            if let Some(token) = &self.inner.auth_token {
                pairs.append_pair("auth", token.expose_secret());
            }
        }

        Ok(url)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, RemoteError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Remote database returned non-success status"
            );
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(body)
    }

    async fn get_text(&self, url: Url) -> Result<String, RemoteError> {
        self.send(self.inner.client.get(url)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse remote database response"
            );
            RemoteError::Parse(e)
        })
    }
}

/// Query-string value for the REST filter parameters, which take JSON.
fn json_param(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

#[async_trait]
impl Catalog for RealtimeDbClient {
    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<Category>, RemoteError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let url = self.endpoint(&["categories"], &[])?;
        let entries = parse_collection::<CategoryRecord>(&self.get_text(url).await?)?;
        let categories = convert_all(entries, convert_category);

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    #[instrument(skip(self), fields(category = ?query.category_id, limit = ?query.effective_limit()))]
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RemoteError> {
        let cache_key = CacheKey::products(query);

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let params = match (&query.category_id, query.effective_limit()) {
            (Some(category), _) => vec![
                ("orderBy", json_param("category")),
                ("equalTo", json_param(category.as_str())),
            ],
            (None, Some(limit)) => vec![
                ("orderBy", json_param("$key")),
                ("limitToFirst", limit.to_string()),
            ],
            (None, None) => Vec::new(),
        };

        let url = self.endpoint(&["products"], &params)?;
        let entries = parse_collection::<ProductRecord>(&self.get_text(url).await?)?;
        let mut products = convert_all(entries, convert_product);
        // Filtered responses are unordered JSON objects; the limit is
        // applied server-side, this only fixes the order.
        products.sort_by(|a, b| a.id.cmp(&b.id));

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RemoteError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }

        let url = self.endpoint(&["products", id.as_str()], &[])?;
        let Some(record) = self.get_json::<Option<ProductRecord>>(url).await? else {
            return Ok(None);
        };
        let product = convert_product(id.to_string(), record)?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(Some(product))
    }
}

#[async_trait]
impl OrderSubmission for RealtimeDbClient {
    #[instrument(skip(self, draft), fields(user_id = %draft.user_id, items = draft.items.len()))]
    async fn submit_order(&self, draft: OrderDraft) -> Result<Order, RemoteError> {
        if draft.user_id.is_blank() {
            return Err(RemoteError::InvalidRequest(
                "a user id is required to create an order".to_string(),
            ));
        }

        let url = self.endpoint(&["users", draft.user_id.as_str(), "orders"], &[])?;
        let body = NewOrderRecord::from(&draft);
        let response = self
            .send(self.inner.client.post(url).json(&body))
            .await?;
        let PushResponse { name } = serde_json::from_str(&response)?;

        // The stored timestamp is the server's; this is the local estimate.
        Ok(Order::from_draft(draft, OrderId::new(name), Utc::now()))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn fetch_orders(&self, user_id: &UserId) -> Result<Vec<Order>, RemoteError> {
        if user_id.is_blank() {
            debug!("No user id, returning no orders");
            return Ok(Vec::new());
        }

        let url = self.endpoint(
            &["users", user_id.as_str(), "orders"],
            &[("orderBy", json_param("timestamp"))],
        )?;
        let entries = parse_collection::<OrderRecord>(&self.get_text(url).await?)?;
        let mut orders = convert_all(entries, |key, record| convert_order(user_id, key, record));
        sort_newest_first(&mut orders);

        Ok(orders)
    }
}

impl std::fmt::Debug for RealtimeDbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeDbClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field(
                "auth_token",
                &self.inner.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}
