//! Local store inspection.

use petshop_cart::AppState;

use super::CliError;

#[allow(clippy::print_stdout)]
pub fn status(state: &AppState) -> Result<(), CliError> {
    let snapshot = state.cart().snapshot();
    let durability = if state.cart().persistence_available() {
        "durable"
    } else {
        "memory-only"
    };

    println!("Store: {durability}");
    println!("Policy: {:?}", state.cart().policy());
    println!(
        "Cart: {} lines, {} items",
        snapshot.items.len(),
        snapshot.total_item_count
    );
    if let Some(error) = snapshot.error {
        println!("Last error: {error}");
    }
    Ok(())
}
