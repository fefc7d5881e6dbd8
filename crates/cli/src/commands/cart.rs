//! Cart commands.
//!
//! Each one applies a single intent and prints the resulting cart. A store
//! error recorded along the way fails the command, since this process is
//! the only holder of the in-memory cart.

use petshop_cart::remote::{Catalog, RemoteError};
use petshop_cart::{AppState, CartSnapshot, models::NewLineItem};
use petshop_core::ProductId;

use super::CliError;

pub fn show(state: &AppState) -> Result<(), CliError> {
    report(&state.cart().snapshot())
}

pub async fn add(state: &AppState, product_id: &str) -> Result<(), CliError> {
    let id = ProductId::parse(product_id).map_err(|e| {
        petshop_cart::CartError::Validation(format!("product id: {e}"))
    })?;
    let product = state
        .catalog()
        .get_product(&id)
        .await?
        .ok_or_else(|| RemoteError::NotFound(format!("product {id}")))?;

    if product.stock == 0 {
        tracing::warn!(id = %id, "Product is out of stock");
    }

    let snapshot = state.cart().add_item(NewLineItem::from(&product)).await;
    report(&snapshot)
}

pub async fn remove(state: &AppState, product_id: &str) -> Result<(), CliError> {
    let snapshot = state.cart().remove_item(&ProductId::new(product_id)).await;
    report(&snapshot)
}

pub async fn increment(state: &AppState, product_id: &str) -> Result<(), CliError> {
    let snapshot = state
        .cart()
        .increment_quantity(&ProductId::new(product_id))
        .await;
    report(&snapshot)
}

pub async fn decrement(state: &AppState, product_id: &str) -> Result<(), CliError> {
    let snapshot = state
        .cart()
        .decrement_quantity(&ProductId::new(product_id))
        .await;
    report(&snapshot)
}

pub async fn clear(state: &AppState) -> Result<(), CliError> {
    let snapshot = state.cart().clear_and_sync().await;
    report(&snapshot)
}

/// Print the cart, then fail if an error is sitting in its slot.
#[allow(clippy::print_stdout)]
fn report(snapshot: &CartSnapshot) -> Result<(), CliError> {
    print!("{}", render(snapshot));
    match &snapshot.error {
        Some(error) => Err(CliError::Recorded(error.clone())),
        None => Ok(()),
    }
}

fn render(snapshot: &CartSnapshot) -> String {
    if snapshot.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    for item in &snapshot.items {
        out.push_str(&format!(
            "{:>4} x {} ({}) @ {} = {:.2}\n",
            item.quantity,
            item.name,
            item.id,
            item.unit_price,
            item.line_total()
        ));
    }
    out.push_str(&format!(
        "Items: {}  Total: {:.2}\n",
        snapshot.total_item_count, snapshot.total_amount
    ));
    out
}
