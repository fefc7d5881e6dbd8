//! Unified error handling for the cart engine.
//!
//! Every failure a caller can observe is a [`CartError`]. The coordinator
//! records them in the cart's error slot as `Arc<CartError>` so snapshots
//! stay cheap to clone.

use thiserror::Error;

use crate::remote::RemoteError;
use crate::store::StoreError;

/// Application-level error type for the cart engine.
#[derive(Debug, Error)]
pub enum CartError {
    /// Caller input was malformed (blank id, empty cart, missing user).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Local store read or write failed.
    ///
    /// Non-fatal: the next successful write for the same id repairs it.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Catalog fetch or order submission failed.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// The platform has no durable store; the cart is memory-only.
    #[error("Durable cart storage is not available on this platform")]
    CapabilityUnavailable,
}

impl CartError {
    /// Whether this error came from the local store.
    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// Whether this error came from a remote collaborator.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}
