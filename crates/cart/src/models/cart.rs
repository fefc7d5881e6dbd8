//! Cart line types.

use rust_decimal::Decimal;
use petshop_core::{Price, ProductId};

use super::catalog::Product;

/// One product's quantity/price entry in the cart.
///
/// The line's `id` is the product id; there is no separate cart-entry
/// identity, so a product appears at most once in a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineItem {
    /// Product id (also the cart key).
    pub id: ProductId,
    /// Product name at the time it was added.
    pub name: String,
    /// Unit price at the time it was added.
    pub unit_price: Price,
    /// Always at least 1.
    pub quantity: u32,
    /// Product image, if any.
    pub image_url: Option<String>,
}

impl CartLineItem {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.times(self.quantity)
    }
}

/// What a caller hands to `add_item`: a product without a quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub image_url: Option<String>,
}

impl NewLineItem {
    /// Build a line with the given quantity.
    #[must_use]
    pub fn with_quantity(self, quantity: u32) -> CartLineItem {
        CartLineItem {
            id: self.id,
            name: self.name,
            unit_price: self.unit_price,
            quantity,
            image_url: self.image_url,
        }
    }
}

impl From<&Product> for NewLineItem {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            image_url: product.image_url.clone(),
        }
    }
}
