//! Wire records for the remote database and their conversions.
//!
//! Collections arrive as JSON objects keyed by record id (or `null` when
//! empty); the key becomes the domain id. Prices travel as JSON numbers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use petshop_core::{CategoryId, OrderId, OrderStatus, Price, ProductId, UserId};

use super::RemoteError;
use crate::models::{CartLineItem, Category, Order, OrderDraft, Product};

// =============================================================================
// Collections
// =============================================================================

/// A keyed collection as returned by the REST API.
///
/// Collections whose keys all look like small integers come back as JSON
/// arrays with `null` holes, so both shapes are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Collection<T> {
    Keyed(BTreeMap<String, T>),
    Indexed(Vec<Option<T>>),
}

impl<T> Collection<T> {
    /// `(key, record)` pairs in key order.
    pub fn into_entries(self) -> Vec<(String, T)> {
        match self {
            Self::Keyed(map) => map.into_iter().collect(),
            Self::Indexed(items) => items
                .into_iter()
                .enumerate()
                .filter_map(|(i, item)| item.map(|item| (i.to_string(), item)))
                .collect(),
        }
    }
}

/// Parse a collection body, treating `null` as empty.
pub fn parse_collection<T>(body: &str) -> Result<Vec<(String, T)>, RemoteError>
where
    T: for<'de> Deserialize<'de>,
{
    let collection: Option<Collection<T>> = serde_json::from_str(body)?;
    Ok(collection.map(Collection::into_entries).unwrap_or_default())
}

/// Convert every entry, logging and dropping the ones that fail.
pub fn convert_all<T, U>(
    entries: Vec<(String, T)>,
    convert: impl Fn(String, T) -> Result<U, RemoteError>,
) -> Vec<U> {
    entries
        .into_iter()
        .filter_map(|(key, record)| match convert(key, record) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Skipping invalid remote record");
                None
            }
        })
        .collect()
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub stock: u32,
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[allow(clippy::unnecessary_wraps)]
pub fn convert_category(key: String, record: CategoryRecord) -> Result<Category, RemoteError> {
    Ok(Category {
        id: CategoryId::new(key),
        name: record.name,
        image_url: record.image_url,
    })
}

pub fn convert_product(key: String, record: ProductRecord) -> Result<Product, RemoteError> {
    let price = Price::new(record.price).map_err(|e| RemoteError::InvalidRecord {
        key: key.clone(),
        reason: e.to_string(),
    })?;

    Ok(Product {
        id: ProductId::new(key),
        name: record.name,
        price,
        stock: record.stock,
        category: CategoryId::new(record.category),
        image_url: record.image_url,
        description: record.description,
    })
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRecord {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&CartLineItem> for LineRecord {
    fn from(item: &CartLineItem) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            price: item.unit_price.amount(),
            quantity: item.quantity,
            image_url: item.image_url.clone(),
        }
    }
}

impl TryFrom<LineRecord> for CartLineItem {
    type Error = RemoteError;

    fn try_from(record: LineRecord) -> Result<Self, Self::Error> {
        let invalid = |reason: String| RemoteError::InvalidRecord {
            key: record.id.clone(),
            reason,
        };
        let unit_price = Price::new(record.price).map_err(|e| invalid(e.to_string()))?;
        if record.quantity == 0 {
            return Err(invalid("quantity must be at least 1".to_string()));
        }

        Ok(Self {
            id: ProductId::new(record.id),
            name: record.name,
            unit_price,
            quantity: record.quantity,
            image_url: record.image_url,
        })
    }
}

/// Placeholder the server replaces with its own clock on write.
#[derive(Debug, Serialize)]
pub struct ServerTimestamp {
    #[serde(rename = ".sv")]
    sv: &'static str,
}

impl ServerTimestamp {
    pub const NOW: Self = Self { sv: "timestamp" };
}

/// Body of an order `POST`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRecord {
    pub user_id: String,
    pub items: Vec<LineRecord>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub timestamp: ServerTimestamp,
}

impl From<&OrderDraft> for NewOrderRecord {
    fn from(draft: &OrderDraft) -> Self {
        Self {
            user_id: draft.user_id.to_string(),
            items: draft.items.iter().map(LineRecord::from).collect(),
            total_amount: draft.total_amount,
            status: draft.status,
            timestamp: ServerTimestamp::NOW,
        }
    }
}

/// Response to a `POST`: the generated key.
#[derive(Debug, Deserialize)]
pub struct PushResponse {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(default)]
    pub items: Vec<LineRecord>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Convert a stored order. The owner comes from the path, not the record.
pub fn convert_order(
    user_id: &UserId,
    key: String,
    record: OrderRecord,
) -> Result<Order, RemoteError> {
    let items = record
        .items
        .into_iter()
        .map(CartLineItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let timestamp = record
        .timestamp
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_default();

    Ok(Order {
        id: OrderId::new(key),
        user_id: user_id.clone(),
        items,
        total_amount: record.total_amount,
        status: record.status,
        timestamp,
    })
}

/// Most recent first; ties broken by key, newest key first.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_null_collection_is_empty() {
        let entries: Vec<(String, CategoryRecord)> = parse_collection("null").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_keyed_and_indexed_collections() {
        let keyed: Vec<(String, CategoryRecord)> =
            parse_collection(r#"{"dogs": {"name": "Dogs"}, "cats": {"name": "Cats", "imageUrl": "c.png"}}"#)
                .unwrap();
        let keys: Vec<&str> = keyed.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["cats", "dogs"]);

        let indexed: Vec<(String, CategoryRecord)> =
            parse_collection(r#"[null, {"name": "One"}, {"name": "Two"}]"#).unwrap();
        let keys: Vec<&str> = indexed.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["1", "2"]);
    }

    #[test]
    fn test_product_record_conversion() {
        let record: ProductRecord = serde_json::from_str(
            r#"{"name": "Kibble", "price": 25.5, "stock": 4, "category": "dogs", "imageUrl": "k.png"}"#,
        )
        .unwrap();
        let product = convert_product("p1".to_string(), record).unwrap();

        assert_eq!(product.id.as_str(), "p1");
        assert_eq!(product.price.amount(), Decimal::new(255, 1));
        assert_eq!(product.category.as_str(), "dogs");
        assert_eq!(product.image_url.as_deref(), Some("k.png"));
        assert_eq!(product.description, None);
    }

    #[test]
    fn test_negative_price_is_invalid() {
        let record: ProductRecord =
            serde_json::from_str(r#"{"name": "Oops", "price": -1, "category": "x"}"#).unwrap();
        assert!(matches!(
            convert_product("p1".to_string(), record),
            Err(RemoteError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_convert_all_skips_bad_records() {
        let entries: Vec<(String, ProductRecord)> = parse_collection(
            r#"{"a": {"name": "A", "price": 1, "category": "x"}, "b": {"name": "B", "price": -2, "category": "x"}}"#,
        )
        .unwrap();
        let products = convert_all(entries, convert_product);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id.as_str(), "a");
    }

    #[test]
    fn test_new_order_body_shape() {
        let draft = OrderDraft {
            user_id: UserId::new("u1"),
            items: vec![CartLineItem {
                id: ProductId::new("p1"),
                name: "Kibble".to_string(),
                unit_price: "12.50".parse().unwrap(),
                quantity: 2,
                image_url: None,
            }],
            total_amount: Decimal::new(2500, 2),
            status: OrderStatus::Processing,
        };
        let body = serde_json::to_value(NewOrderRecord::from(&draft)).unwrap();

        assert_eq!(body["userId"], "u1");
        assert_eq!(body["totalAmount"], 25.0);
        assert_eq!(body["status"], "processing");
        assert_eq!(body["timestamp"][".sv"], "timestamp");
        assert_eq!(body["items"][0]["price"], 12.5);
        assert_eq!(body["items"][0]["quantity"], 2);
    }

    #[test]
    fn test_order_record_accepts_legacy_status() {
        let record: OrderRecord = serde_json::from_str(
            r#"{"items": [{"id": "p1", "name": "Kibble", "price": 3, "quantity": 1}], "totalAmount": 3, "status": "Procesando", "timestamp": 1700000000000}"#,
        )
        .unwrap();
        let order = convert_order(&UserId::new("u1"), "-Nabc".to_string(), record).unwrap();

        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.id.as_str(), "-Nabc");
        assert_eq!(order.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(order.item_count(), 1);
    }

    #[test]
    fn test_sort_newest_first() {
        let at = |key: &str, ms: i64| Order {
            id: OrderId::new(key),
            user_id: UserId::new("u1"),
            items: Vec::new(),
            total_amount: Decimal::ZERO,
            status: OrderStatus::Processing,
            timestamp: DateTime::<Utc>::from_timestamp_millis(ms).unwrap(),
        };
        let mut orders = vec![at("a", 1), at("c", 3), at("b", 3)];
        sort_newest_first(&mut orders);

        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
    }
}
