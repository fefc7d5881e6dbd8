//! Integration tests for the Petshop cart engine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p petshop-integration-tests
//! ```
//!
//! Every test gets its own temporary `SQLite` file and an in-memory remote
//! seeded with [`seed_catalog`], so tests can run in parallel and need no
//! network.
//!
//! # Test Categories
//!
//! - `cart_sync` - Intents, hydration and restarts against a real store
//! - `checkout` - Order submission and what it does to the cart
//! - `catalog` - Catalog queries

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use tempfile::TempDir;

use petshop_cart::config::{CartConfig, StoreBackend};
use petshop_cart::models::{Category, NewLineItem, Product};
use petshop_cart::remote::InMemoryRemote;
use petshop_cart::{AppState, PersistencePolicy, StartupError};
use petshop_core::{CategoryId, Price, ProductId};

/// Error setting up a test context.
pub type TestError = Box<dyn std::error::Error>;

/// A running engine over a temporary database.
pub struct TestContext {
    /// Owns the database file; dropped with the context.
    pub dir: TempDir,
    pub remote: InMemoryRemote,
    pub state: AppState,
    policy: PersistencePolicy,
}

impl TestContext {
    /// Start with the default persistence policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory or store cannot be created.
    pub async fn new() -> Result<Self, TestError> {
        Self::with_policy(PersistencePolicy::default()).await
    }

    /// Start with the given persistence policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory or store cannot be created.
    pub async fn with_policy(policy: PersistencePolicy) -> Result<Self, TestError> {
        let dir = tempfile::tempdir()?;
        let remote = seed_catalog();
        let config = config_for(&dir, policy);
        let state = AppState::with_remote(&config, Arc::new(remote.clone())).await?;

        Ok(Self {
            dir,
            remote,
            state,
            policy,
        })
    }

    /// Simulate a process restart: a fresh context over the same database
    /// file and remote, hydrated from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reopened.
    pub async fn restart(&self) -> Result<AppState, StartupError> {
        let config = config_for(&self.dir, self.policy);
        AppState::with_remote(&config, Arc::new(self.remote.clone())).await
    }
}

fn config_for(dir: &TempDir, policy: PersistencePolicy) -> CartConfig {
    CartConfig {
        store: StoreBackend::Sqlite {
            database_url: format!("sqlite://{}", dir.path().join("cart.db").display()),
        },
        catalog: None,
        persistence_policy: policy,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Memory-only configuration.
#[must_use]
pub fn memory_only_config() -> CartConfig {
    CartConfig {
        store: StoreBackend::Disabled,
        catalog: None,
        persistence_policy: PersistencePolicy::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A remote with two categories and nine products.
///
/// - `p1` Kibble, 10.00, dogs
/// - `p2` Leash, 25.50, dogs
/// - `p3` Scratcher, 9.99, cats
/// - `d1`..`d6` dog toys, 1.00 each
#[must_use]
pub fn seed_catalog() -> InMemoryRemote {
    let remote = InMemoryRemote::new();
    remote.insert_category(category("dogs", "Dogs"));
    remote.insert_category(category("cats", "Cats"));

    remote.insert_product(product("p1", "Kibble", 1000, "dogs"));
    remote.insert_product(product("p2", "Leash", 2550, "dogs"));
    remote.insert_product(product("p3", "Scratcher", 999, "cats"));
    for n in 1..=6 {
        remote.insert_product(product(&format!("d{n}"), &format!("Dog toy {n}"), 100, "dogs"));
    }

    remote
}

/// The cart line for a seeded product.
#[must_use]
pub fn line(id: &str, name: &str, cents: i64) -> NewLineItem {
    NewLineItem::from(&product(id, name, cents, "dogs"))
}

fn category(id: &str, name: &str) -> Category {
    Category {
        id: CategoryId::new(id),
        name: name.to_string(),
        image_url: None,
    }
}

fn product(id: &str, name: &str, cents: i64, category: &str) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Price::from_cents(cents).unwrap_or(Price::ZERO),
        stock: 10,
        category: CategoryId::new(category),
        image_url: Some(format!("https://img.example.com/{id}.png")),
        description: None,
    }
}
