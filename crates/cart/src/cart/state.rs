//! In-memory cart state and its pure transitions.

use std::sync::Arc;

use rust_decimal::Decimal;

use petshop_core::ProductId;

use crate::error::CartError;
use crate::models::{CartLineItem, NewLineItem};

/// The canonical in-memory cart.
///
/// Items keep insertion order. Every transition is synchronous and touches
/// nothing but this struct.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    items: Vec<CartLineItem>,
    is_loading: bool,
    error: Option<Arc<CartError>>,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Add one unit of a product: bump the quantity if it's already in the
    /// cart, otherwise append it with quantity 1.
    ///
    /// An existing line keeps its original name and price.
    pub fn add_item(&mut self, item: NewLineItem) {
        if let Some(existing) = self.find_mut(&item.id) {
            existing.quantity = existing.quantity.saturating_add(1);
        } else {
            self.items.push(item.with_quantity(1));
        }
    }

    /// Remove a product's line. No-op if absent.
    pub fn remove_item(&mut self, id: &ProductId) {
        self.items.retain(|item| &item.id != id);
    }

    /// Add one unit to an existing line. No-op if absent.
    pub fn increment_quantity(&mut self, id: &ProductId) {
        if let Some(existing) = self.find_mut(id) {
            existing.quantity = existing.quantity.saturating_add(1);
        }
    }

    /// Take one unit off a line, removing it when the last unit goes.
    pub fn decrement_quantity(&mut self, id: &ProductId) {
        let Some(existing) = self.find_mut(id) else {
            return;
        };
        if existing.quantity > 1 {
            existing.quantity -= 1;
            return;
        }
        self.remove_item(id);
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Overwrite the cart with hydrated items. Not a merge.
    pub fn replace_all(&mut self, items: Vec<CartLineItem>) {
        self.items = items;
    }

    /// Put a single line back the way it was.
    ///
    /// `prior = None` removes the line; `Some` replaces it in place or
    /// appends it if it has since been removed.
    pub fn restore(&mut self, id: &ProductId, prior: Option<CartLineItem>) {
        match prior {
            Some(line) => {
                if let Some(existing) = self.find_mut(id) {
                    *existing = line;
                } else {
                    self.items.push(line);
                }
            }
            None => self.remove_item(id),
        }
    }

    // =========================================================================
    // Loading / error slot
    // =========================================================================

    pub(crate) fn set_loading(&mut self, is_loading: bool) {
        self.is_loading = is_loading;
    }

    pub(crate) fn record_error(&mut self, error: Arc<CartError>) {
        self.error = Some(error);
    }

    /// Empty the error slot.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The line for `id`, if present.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// All lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Whether the cart is being hydrated from the store.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// The last recorded error, if not yet cleared.
    #[must_use]
    pub fn error(&self) -> Option<Arc<CartError>> {
        self.error.clone()
    }

    /// `Σ unit_price × quantity`.
    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// `Σ quantity`.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// An immutable view for callers.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
            total_amount: self.total_amount(),
            total_item_count: self.total_item_count(),
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }

    fn find_mut(&mut self, id: &ProductId) -> Option<&mut CartLineItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }
}

/// What every cart operation hands back: the lines, derived totals, the
/// loading flag, and the error slot.
#[derive(Debug, Clone, Default)]
pub struct CartSnapshot {
    pub items: Vec<CartLineItem>,
    pub total_amount: Decimal,
    pub total_item_count: u64,
    pub is_loading: bool,
    pub error: Option<Arc<CartError>>,
}

impl CartSnapshot {
    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The line for `id`, if present.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.id == id)
    }
}
