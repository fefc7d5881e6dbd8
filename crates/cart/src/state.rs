//! Application context built once at startup.

use std::sync::Arc;

use tracing::info;

use petshop_core::UserId;

use crate::cart::{CartSnapshot, PersistencePolicy, SyncCoordinator};
use crate::config::{CartConfig, ConfigError};
use crate::error::CartError;
use crate::models::Order;
use crate::remote::{Catalog, OrderSubmission, RealtimeDbClient};
use crate::store::{CartStore, StoreError, open_cart_store};

/// Error building the application context.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("cart store error: {0}")]
    Store(#[from] StoreError),
}

/// Everything a caller needs to drive the cart: the coordinator, the
/// store it writes to, and the remote collaborators.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn CartStore>,
    catalog: Arc<dyn Catalog>,
    orders: Arc<dyn OrderSubmission>,
    cart: SyncCoordinator,
}

impl AppState {
    /// Open the configured store, connect the remote client, and hydrate
    /// the cart.
    ///
    /// A failed hydration does not fail startup; it is recorded in the
    /// cart's error slot.
    ///
    /// # Errors
    ///
    /// Returns `StartupError::Config` if no remote database is configured.
    /// Returns `StartupError::Store` if the store cannot be opened.
    pub async fn new(config: &CartConfig) -> Result<Self, StartupError> {
        let catalog = config
            .catalog
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("CATALOG_BASE_URL".to_string()))?;
        let remote = Arc::new(RealtimeDbClient::new(catalog));

        Self::with_remote(config, remote).await
    }

    /// Like [`Self::new`], but with a caller-supplied catalog and order
    /// service instead of the configured remote database.
    ///
    /// # Errors
    ///
    /// Returns `StartupError::Store` if the store cannot be opened.
    pub async fn with_remote<R>(config: &CartConfig, remote: Arc<R>) -> Result<Self, StartupError>
    where
        R: Catalog + OrderSubmission + 'static,
    {
        let store = open_cart_store(&config.store).await?;

        let state = Self::from_parts(
            store,
            remote.clone(),
            remote,
            config.persistence_policy,
        );
        let snapshot = state.hydrate().await;
        info!(
            items = snapshot.items.len(),
            durable = state.cart().persistence_available(),
            "Cart ready"
        );

        Ok(state)
    }

    /// Assemble a context from already-built collaborators. The cart starts
    /// empty; call [`Self::hydrate`] to load it.
    #[must_use]
    pub fn from_parts(
        store: Arc<dyn CartStore>,
        catalog: Arc<dyn Catalog>,
        orders: Arc<dyn OrderSubmission>,
        policy: PersistencePolicy,
    ) -> Self {
        let cart = SyncCoordinator::new(Arc::clone(&store), policy);
        Self {
            inner: Arc::new(AppStateInner {
                store,
                catalog,
                orders,
                cart,
            }),
        }
    }

    /// Load the cart from the store.
    pub async fn hydrate(&self) -> CartSnapshot {
        self.inner.cart.load_cart().await
    }

    /// Submit the cart as an order for `user_id`.
    ///
    /// # Errors
    ///
    /// See [`SyncCoordinator::checkout`].
    pub async fn checkout(&self, user_id: &UserId) -> Result<Order, CartError> {
        self.inner
            .cart
            .checkout(user_id, self.inner.orders.as_ref())
            .await
    }

    /// Get a reference to the cart coordinator.
    #[must_use]
    pub fn cart(&self) -> &SyncCoordinator {
        &self.inner.cart
    }

    /// Get a reference to the local cart store.
    #[must_use]
    pub fn store(&self) -> &dyn CartStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.inner.catalog.as_ref()
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderSubmission {
        self.inner.orders.as_ref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}
