//! Store for platforms without an embedded storage engine.

use async_trait::async_trait;

use petshop_core::{ProductId, StoreCapability};

use super::{CartStore, StoreError};
use crate::models::CartLineItem;

/// Drops every write and reads back nothing.
///
/// Reports [`StoreCapability::Unavailable`] so callers can tell an inert
/// store from a successful write.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCartStore;

#[async_trait]
impl CartStore for NullCartStore {
    fn capability(&self) -> StoreCapability {
        StoreCapability::Unavailable
    }

    async fn upsert(&self, _item: &CartLineItem) -> Result<(), StoreError> {
        Ok(())
    }

    async fn update_quantity(&self, _id: &ProductId, _quantity: u32) -> Result<bool, StoreError> {
        // Report the row as present so callers don't follow up with an upsert.
        Ok(true)
    }

    async fn delete(&self, _id: &ProductId) -> Result<(), StoreError> {
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<CartLineItem>, StoreError> {
        Ok(Vec::new())
    }
}
