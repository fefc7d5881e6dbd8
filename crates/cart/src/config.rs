//! Cart engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CATALOG_BASE_URL` - Root URL of the remote catalog/order database.
//!   Without it the remote client cannot be built; callers must supply
//!   their own catalog (see `AppState::with_remote`)
//! - `CART_STORE` - `sqlite` (default) or `none` for memory-only operation
//! - `CART_DATABASE_URL` - `SQLite` URL (default: `sqlite://petshop.db`)
//! - `CATALOG_AUTH_TOKEN` - Token appended to remote requests as `auth=`
//! - `CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `CART_PERSISTENCE_POLICY` - `accept` (default) or `rollback`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::cart::PersistencePolicy;

const DEFAULT_DATABASE_URL: &str = "sqlite://petshop.db";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which local store backs the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Embedded `SQLite` database.
    Sqlite {
        /// Connection URL, e.g. `sqlite://petshop.db`.
        database_url: String,
    },
    /// No durable store; the cart lives in memory only.
    Disabled,
}

/// Cart engine configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Local cart store
    pub store: StoreBackend,
    /// Remote catalog and order service, if configured
    pub catalog: Option<CatalogConfig>,
    /// What to do with the in-memory cart when a store write fails
    pub persistence_policy: PersistencePolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. `production`, `staging`)
    pub sentry_environment: Option<String>,
}

/// Remote catalog configuration.
///
/// Implements `Debug` manually to redact the auth token.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Root URL of the remote database
    pub base_url: Url,
    /// Optional auth token sent with every request
    pub auth_token: Option<SecretString>,
    /// How long catalog reads stay cached
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let store = parse_store_backend(
            &get_env_or_default("CART_STORE", "sqlite"),
            get_env_or_default("CART_DATABASE_URL", DEFAULT_DATABASE_URL),
        )?;
        let persistence_policy = get_env_or_default("CART_PERSISTENCE_POLICY", "accept")
            .parse::<PersistencePolicy>()
            .map_err(|e| ConfigError::InvalidEnvVar("CART_PERSISTENCE_POLICY".to_string(), e))?;

        Ok(Self {
            store,
            catalog: CatalogConfig::from_env()?,
            persistence_policy,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl CatalogConfig {
    /// Load the remote settings; `None` when `CATALOG_BASE_URL` is unset.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(raw_url) = get_optional_env("CATALOG_BASE_URL") else {
            return Ok(None);
        };
        let base_url = parse_base_url(&raw_url)?;
        let cache_ttl_secs = get_env_or_default(
            "CATALOG_CACHE_TTL_SECS",
            &DEFAULT_CACHE_TTL_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("CATALOG_CACHE_TTL_SECS".to_string(), e.to_string())
        })?;

        Ok(Some(Self {
            base_url,
            auth_token: get_optional_env("CATALOG_AUTH_TOKEN").map(SecretString::from),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the store selector.
fn parse_store_backend(kind: &str, database_url: String) -> Result<StoreBackend, ConfigError> {
    match kind.to_ascii_lowercase().as_str() {
        "sqlite" => Ok(StoreBackend::Sqlite { database_url }),
        "none" | "memory" => Ok(StoreBackend::Disabled),
        other => Err(ConfigError::InvalidEnvVar(
            "CART_STORE".to_string(),
            format!("expected `sqlite` or `none`, got `{other}`"),
        )),
    }
}

/// Parse the remote root URL, making sure relative joins stay under it.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_BASE_URL".to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "CATALOG_BASE_URL".to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
