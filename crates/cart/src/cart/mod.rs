//! The cart: pure in-memory state plus the coordinator that keeps it in
//! step with the durable store.
//!
//! - [`CartState`] - synchronous transitions and derived totals
//! - [`SyncCoordinator`] - applies intents to memory, then persists them
//! - checkout lives on the coordinator, see `checkout.rs`

mod checkout;
mod coordinator;
mod state;

pub use coordinator::{PersistencePolicy, SyncCoordinator};
pub use state::{CartSnapshot, CartState};
