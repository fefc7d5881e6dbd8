//! Integration tests for keeping the in-memory cart and the store in step.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;

use petshop_cart::models::CartLineItem;
use petshop_cart::remote::Catalog;
use petshop_cart::store::CartStore;
use petshop_cart::{AppState, CartError, PersistencePolicy};
use petshop_core::ProductId;
use petshop_integration_tests::{TestContext, line, memory_only_config, seed_catalog};

fn pid(id: &str) -> ProductId {
    ProductId::new(id)
}

fn sorted(mut items: Vec<CartLineItem>) -> Vec<CartLineItem> {
    items.sort_by(|a, b| a.id.cmp(&b.id));
    items
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_two_products_total() {
    let ctx = TestContext::new().await.unwrap();
    let cart = ctx.state.cart();

    cart.add_item(line("p1", "Kibble", 1000)).await;
    let snapshot = cart.add_item(line("p2", "Leash", 2550)).await;

    assert_eq!(snapshot.total_amount, Decimal::new(3550, 2));
    assert_eq!(snapshot.total_item_count, 2);
}

#[tokio::test]
async fn test_increment_then_decrement_to_removal() {
    let ctx = TestContext::new().await.unwrap();
    let cart = ctx.state.cart();

    cart.add_item(line("p1", "Kibble", 1000)).await;
    cart.increment_quantity(&pid("p1")).await;
    let snapshot = cart.increment_quantity(&pid("p1")).await;
    assert_eq!(snapshot.get(&pid("p1")).unwrap().quantity, 3);

    for _ in 0..3 {
        cart.decrement_quantity(&pid("p1")).await;
    }
    let snapshot = cart.snapshot();
    assert!(snapshot.get(&pid("p1")).is_none());
    assert_eq!(snapshot.total_item_count, 0);
    assert!(ctx.state.store().read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_from_catalog_product() {
    let ctx = TestContext::new().await.unwrap();
    let product = ctx
        .state
        .catalog()
        .get_product(&pid("p3"))
        .await
        .unwrap()
        .unwrap();

    let snapshot = ctx.state.cart().add_item((&product).into()).await;
    let line = snapshot.get(&pid("p3")).unwrap();
    assert_eq!(line.name, "Scratcher");
    assert_eq!(line.unit_price, product.price);
}

// =============================================================================
// Hydration and restarts
// =============================================================================

#[tokio::test]
async fn test_cart_survives_restart() {
    let ctx = TestContext::new().await.unwrap();
    let cart = ctx.state.cart();
    cart.add_item(line("p1", "Kibble", 1000)).await;
    cart.add_item(line("p2", "Leash", 2550)).await;
    cart.add_item(line("p2", "Leash", 2550)).await;
    cart.add_item(line("d1", "Dog toy 1", 100)).await;
    cart.remove_item(&pid("d1")).await;
    let before = cart.snapshot();

    let restarted = ctx.restart().await.unwrap();
    let after = restarted.cart().snapshot();

    assert_eq!(sorted(after.items), sorted(before.items));
    assert_eq!(after.total_amount, Decimal::new(6100, 2));
    assert_eq!(after.total_item_count, 3);
    assert!(!after.is_loading);
}

#[tokio::test]
async fn test_clear_empties_memory_and_store() {
    let ctx = TestContext::new().await.unwrap();
    let cart = ctx.state.cart();
    cart.add_item(line("p1", "Kibble", 1000)).await;
    cart.add_item(line("p2", "Leash", 2550)).await;

    let snapshot = cart.clear_and_sync().await;
    assert!(snapshot.is_empty());
    assert!(ctx.state.store().read_all().await.unwrap().is_empty());

    let restarted = ctx.restart().await.unwrap();
    assert!(restarted.cart().snapshot().is_empty());
}

#[tokio::test]
async fn test_hydrate_replaces_in_memory_lines() {
    let ctx = TestContext::new().await.unwrap();
    ctx.state.cart().add_item(line("p1", "Kibble", 1000)).await;

    // Another instance over the same file changes the stored cart.
    let other = ctx.restart().await.unwrap();
    other.cart().remove_item(&pid("p1")).await;
    other.cart().add_item(line("p2", "Leash", 2550)).await;

    let snapshot = ctx.state.hydrate().await;
    assert!(snapshot.get(&pid("p1")).is_none());
    assert_eq!(snapshot.get(&pid("p2")).unwrap().quantity, 1);
}

// =============================================================================
// Capability and policies
// =============================================================================

#[tokio::test]
async fn test_memory_only_cart() {
    let state = AppState::with_remote(&memory_only_config(), Arc::new(seed_catalog()))
        .await
        .unwrap();

    assert!(!state.cart().persistence_available());
    assert!(matches!(
        state.cart().require_durable(),
        Err(CartError::CapabilityUnavailable)
    ));

    let snapshot = state.cart().add_item(line("p1", "Kibble", 1000)).await;
    assert_eq!(snapshot.total_item_count, 1);
    assert!(snapshot.error.is_none());

    // Nothing was kept.
    let restarted = AppState::with_remote(&memory_only_config(), Arc::new(seed_catalog()))
        .await
        .unwrap();
    assert!(restarted.cart().snapshot().is_empty());
}

#[tokio::test]
async fn test_policy_is_carried_into_coordinator() {
    let ctx = TestContext::with_policy(PersistencePolicy::Rollback)
        .await
        .unwrap();
    assert_eq!(ctx.state.cart().policy(), PersistencePolicy::Rollback);
    assert!(ctx.state.cart().require_durable().is_ok());
}
