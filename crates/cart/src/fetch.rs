//! Loading/error tracking for one-shot remote reads.
//!
//! Each call site that fetches from the catalog or order service keeps its
//! own [`FetchState`], so a failed category fetch does not hide a
//! successful product fetch.

use std::future::Future;
use std::sync::Arc;

use crate::remote::RemoteError;

/// The last result of a remote read plus whether one is in flight.
#[derive(Debug, Clone)]
pub struct FetchState<T> {
    data: Option<T>,
    is_loading: bool,
    error: Option<Arc<RemoteError>>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

impl<T> FetchState<T> {
    /// Nothing fetched yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a fetch as started. Clears the previous error; keeps the
    /// previous data.
    pub fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    /// Record how a fetch ended. A failure keeps the previous data.
    pub fn finish(&mut self, result: Result<T, RemoteError>) {
        self.is_loading = false;
        match result {
            Ok(data) => self.data = Some(data),
            Err(e) => self.error = Some(Arc::new(e)),
        }
    }

    /// Run `fetch`, bracketing it with [`Self::begin`] and [`Self::finish`].
    pub async fn track<F>(&mut self, fetch: F) -> &Self
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        self.begin();
        self.finish(fetch.await);
        self
    }

    /// The last successfully fetched value.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// The error from the last fetch, if it failed.
    #[must_use]
    pub fn error(&self) -> Option<Arc<RemoteError>> {
        self.error.clone()
    }

    /// Drop the fetched value and any error.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
