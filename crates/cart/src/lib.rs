//! Petshop cart engine.
//!
//! Keeps an in-memory cart (instant feedback, totals) consistent with a
//! durable on-device store, and talks to the remote catalog and order
//! service as external collaborators.
//!
//! # Modules
//!
//! - [`cart`] - In-memory cart state and the sync coordinator
//! - [`store`] - Durable cart line storage (`SQLite` or a null object)
//! - [`remote`] - Catalog and order submission clients
//! - [`fetch`] - Per-call loading/error tracking for one-shot remote reads
//! - [`state`] - Application context built once at startup

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod remote;
pub mod state;
pub mod store;

pub use cart::{CartSnapshot, CartState, PersistencePolicy, SyncCoordinator};
pub use error::CartError;
pub use state::{AppState, StartupError};
