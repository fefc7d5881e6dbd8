//! Durable on-device storage for cart lines.
//!
//! # Table: `cart_items`
//!
//! One row per product in the cart, keyed by product id. No sort key is
//! persisted, so [`CartStore::read_all`] returns rows in whatever order the
//! engine chooses.
//!
//! # Backends
//!
//! - [`SqliteCartStore`] - embedded `SQLite` database, schema managed by
//!   the migrations in `crates/cart/migrations/`
//! - [`NullCartStore`] - for platforms without an embedded storage engine;
//!   every write is dropped and reads are empty
//!
//! The backend is picked once at startup by [`open_cart_store`]. Callers
//! that need durability check [`CartStore::capability`] instead of assuming
//! writes stuck.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use petshop_core::{ProductId, StoreCapability};

use crate::config::StoreBackend;
use crate::models::CartLineItem;

mod null;
mod sqlite;

pub use null::NullCartStore;
pub use sqlite::SqliteCartStore;

/// Errors from the local cart store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed while opening the store.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Keyed storage for cart lines.
///
/// Every write is keyed by product id and idempotent, so two overlapping
/// writes for the same id converge on the last one to land.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Whether writes to this store survive a restart.
    fn capability(&self) -> StoreCapability;

    /// Insert the line, or replace the existing row for its id.
    async fn upsert(&self, item: &CartLineItem) -> Result<(), StoreError>;

    /// Set the quantity of an existing row.
    ///
    /// Returns `false` when no row exists for `id`.
    async fn update_quantity(&self, id: &ProductId, quantity: u32) -> Result<bool, StoreError>;

    /// Delete the row for `id`. Deleting a missing row is not an error.
    async fn delete(&self, id: &ProductId) -> Result<(), StoreError>;

    /// Delete every row.
    async fn delete_all(&self) -> Result<(), StoreError>;

    /// Read every row, in unspecified order.
    async fn read_all(&self) -> Result<Vec<CartLineItem>, StoreError>;
}

/// Open the store selected by configuration.
///
/// # Errors
///
/// Returns `StoreError` if the `SQLite` database cannot be opened or migrated.
pub async fn open_cart_store(backend: &StoreBackend) -> Result<Arc<dyn CartStore>, StoreError> {
    match backend {
        StoreBackend::Sqlite { database_url } => {
            let store = SqliteCartStore::connect(database_url).await?;
            tracing::info!(database_url = %database_url, "Opened SQLite cart store");
            Ok(Arc::new(store))
        }
        StoreBackend::Disabled => {
            tracing::info!("Cart persistence disabled, running memory-only");
            Ok(Arc::new(NullCartStore))
        }
    }
}
