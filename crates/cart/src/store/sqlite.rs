//! `SQLite`-backed cart store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, instrument, warn};

use petshop_core::{Price, ProductId, StoreCapability};

use super::{CartStore, StoreError};
use crate::models::CartLineItem;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Row type for `cart_items`.
#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: ProductId,
    name: String,
    unit_price: String,
    quantity: i64,
    image_url: Option<String>,
}

impl TryFrom<CartItemRow> for CartLineItem {
    type Error = StoreError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let amount = Decimal::from_str(&row.unit_price).map_err(|e| {
            StoreError::DataCorruption(format!("invalid unit_price for {}: {e}", row.id))
        })?;
        let unit_price = Price::new(amount).map_err(|e| {
            StoreError::DataCorruption(format!("invalid unit_price for {}: {e}", row.id))
        })?;
        let quantity = u32::try_from(row.quantity)
            .ok()
            .filter(|&q| q >= 1)
            .ok_or_else(|| {
                StoreError::DataCorruption(format!(
                    "invalid quantity for {}: {}",
                    row.id, row.quantity
                ))
            })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            unit_price,
            quantity,
            image_url: row.image_url,
        })
    }
}

/// Cart store backed by an embedded `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteCartStore {
    pool: SqlitePool,
}

impl SqliteCartStore {
    /// Open (creating if missing) the database at `database_url` and run
    /// pending migrations.
    ///
    /// Uses a single pooled connection that is never recycled, so
    /// `sqlite::memory:` databases live as long as the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the database cannot be opened.
    /// Returns `StoreError::Migration` if the schema cannot be applied.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        Ok(Self { pool })
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for in-flight queries to finish.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CartStore for SqliteCartStore {
    fn capability(&self) -> StoreCapability {
        StoreCapability::Durable
    }

    #[instrument(skip(self, item), fields(id = %item.id, quantity = item.quantity))]
    async fn upsert(&self, item: &CartLineItem) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT OR REPLACE INTO cart_items (id, product_id, name, unit_price, quantity, image_url)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&item.id)
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.unit_price.amount().to_string())
        .bind(i64::from(item.quantity))
        .bind(item.image_url.as_deref())
        .execute(&self.pool)
        .await?;

        debug!("Cart line upserted");
        Ok(())
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn update_quantity(&self, id: &ProductId, quantity: u32) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE cart_items SET quantity = ? WHERE id = ?")
            .bind(i64::from(quantity))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete(&self, id: &ProductId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cart_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_all(&self) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM cart_items")
            .execute(&self.pool)
            .await?;

        debug!(rows = result.rows_affected(), "Cart store cleared");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read_all(&self) -> Result<Vec<CartLineItem>, StoreError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            "SELECT id, name, unit_price, quantity, image_url FROM cart_items",
        )
        .fetch_all(&self.pool)
        .await?;

        // A corrupt row should not cost the user the rest of their cart.
        let items: Vec<CartLineItem> = rows
            .into_iter()
            .filter_map(|row| match CartLineItem::try_from(row) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupt cart row");
                    None
                }
            })
            .collect();

        debug!(count = items.len(), "Cart lines read");
        Ok(items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::NewLineItem;

    async fn memory_store() -> SqliteCartStore {
        SqliteCartStore::connect("sqlite::memory:").await.unwrap()
    }

    fn line(id: &str, price: &str, quantity: u32) -> CartLineItem {
        NewLineItem {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            unit_price: price.parse().unwrap(),
            image_url: None,
        }
        .with_quantity(quantity)
    }

    fn sorted(mut items: Vec<CartLineItem>) -> Vec<CartLineItem> {
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    #[tokio::test]
    async fn test_upsert_then_read_all() {
        let store = memory_store().await;
        let a = line("a", "10.00", 1);
        let mut b = line("b", "25.50", 2);
        b.image_url = Some("https://img/b.png".to_string());

        store.upsert(&a).await.unwrap();
        store.upsert(&b).await.unwrap();

        assert_eq!(sorted(store.read_all().await.unwrap()), vec![a, b]);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_per_id() {
        let store = memory_store().await;
        store.upsert(&line("a", "1.00", 1)).await.unwrap();
        store.upsert(&line("a", "1.00", 4)).await.unwrap();
        store.upsert(&line("a", "1.00", 4)).await.unwrap();

        let items = store.read_all().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 4);
    }

    #[tokio::test]
    async fn test_update_quantity_reports_missing_row() {
        let store = memory_store().await;
        assert!(!store.update_quantity(&ProductId::new("ghost"), 3).await.unwrap());

        store.upsert(&line("a", "2.00", 1)).await.unwrap();
        assert!(store.update_quantity(&ProductId::new("a"), 3).await.unwrap());
        assert_eq!(store.read_all().await.unwrap()[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let store = memory_store().await;
        store.upsert(&line("a", "2.00", 1)).await.unwrap();
        store.upsert(&line("b", "3.00", 1)).await.unwrap();

        store.delete(&ProductId::new("a")).await.unwrap();
        store.delete(&ProductId::new("missing")).await.unwrap();
        let remaining = store.read_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id.as_str(), "b");

        store.delete_all().await.unwrap();
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_price_round_trips_exactly() {
        let store = memory_store().await;
        store.upsert(&line("a", "19.999", 1)).await.unwrap();

        let items = store.read_all().await.unwrap();
        assert_eq!(items[0].unit_price.amount(), Decimal::new(19999, 3));
    }

    #[tokio::test]
    async fn test_corrupt_rows_are_skipped() {
        let store = memory_store().await;
        store.upsert(&line("good", "1.00", 1)).await.unwrap();
        sqlx::query(
            "INSERT INTO cart_items (id, product_id, name, unit_price, quantity) VALUES ('bad', 'bad', 'Bad', 'not-a-number', 1)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let items = store.read_all().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_str(), "good");
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("cart.db").display());

        let store = SqliteCartStore::connect(&url).await.unwrap();
        store.upsert(&line("a", "7.25", 2)).await.unwrap();
        store.close().await;

        let reopened = SqliteCartStore::connect(&url).await.unwrap();
        assert_eq!(reopened.read_all().await.unwrap(), vec![line("a", "7.25", 2)]);
    }

    #[tokio::test]
    async fn test_capability_is_durable() {
        assert_eq!(memory_store().await.capability(), StoreCapability::Durable);
    }
}
