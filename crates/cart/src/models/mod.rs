//! Domain models for the cart engine.
//!
//! These types represent validated domain objects separate from database
//! rows and remote wire records.

pub mod cart;
pub mod catalog;
pub mod order;

pub use cart::{CartLineItem, NewLineItem};
pub use catalog::{Category, Product};
pub use order::{Order, OrderDraft};
