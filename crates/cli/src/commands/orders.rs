//! Checkout and order history.

use petshop_cart::AppState;
use petshop_cart::remote::OrderSubmission;
use petshop_core::UserId;

use super::CliError;

#[allow(clippy::print_stdout)]
pub async fn checkout(state: &AppState, user: &str) -> Result<(), CliError> {
    let order = state.checkout(&UserId::new(user)).await?;

    println!(
        "Order {} placed: {} items, total {:.2} ({})",
        order.id,
        order.item_count(),
        order.total_amount,
        order.status
    );
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn list(state: &AppState, user: &str) -> Result<(), CliError> {
    let orders = state.orders().fetch_orders(&UserId::new(user)).await?;
    if orders.is_empty() {
        println!("No orders");
        return Ok(());
    }

    for order in &orders {
        println!(
            "{}\t{}\t{} items\t{:.2}\t{}",
            order.id,
            order.timestamp.format("%Y-%m-%d %H:%M"),
            order.item_count(),
            order.total_amount,
            order.status
        );
    }
    Ok(())
}
