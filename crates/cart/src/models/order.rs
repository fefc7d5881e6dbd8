//! Order types owned by the remote order service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use petshop_core::{OrderId, OrderStatus, UserId};

use super::cart::CartLineItem;

/// What checkout submits. The server assigns `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub items: Vec<CartLineItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<CartLineItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
}

impl Order {
    /// Combine a draft with the server-assigned id and timestamp.
    #[must_use]
    pub fn from_draft(draft: OrderDraft, id: OrderId, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            items: draft.items,
            total_amount: draft.total_amount,
            status: draft.status,
            timestamp,
        }
    }

    /// Sum of item quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}
