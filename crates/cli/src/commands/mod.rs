//! Command implementations.

use std::sync::Arc;

use thiserror::Error;

use petshop_cart::config::CartConfig;
use petshop_cart::remote::RemoteError;
use petshop_cart::{AppState, CartError, StartupError};

use crate::fixture::{self, FixtureError};
use crate::{CartAction, CatalogAction, Cli, Commands, StoreAction};

mod cart;
mod catalog;
mod orders;
mod store;

/// Errors a command can end with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("catalog file: {0}")]
    Fixture(#[from] FixtureError),

    /// A tracked fetch that failed.
    #[error("{0}")]
    Fetch(Arc<RemoteError>),

    /// An error the cart recorded while applying the command.
    #[error("{0}")]
    Recorded(Arc<CartError>),
}

/// Build the application context and run the parsed command.
pub async fn run(cli: Cli, config: &CartConfig) -> Result<(), CliError> {
    let state = match &cli.catalog_file {
        Some(path) => {
            let remote = fixture::load(path).await?;
            AppState::with_remote(config, Arc::new(remote)).await?
        }
        None => AppState::new(config).await?,
    };

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => cart::show(&state),
            CartAction::Add { product_id } => cart::add(&state, &product_id).await,
            CartAction::Remove { product_id } => cart::remove(&state, &product_id).await,
            CartAction::Inc { product_id } => cart::increment(&state, &product_id).await,
            CartAction::Dec { product_id } => cart::decrement(&state, &product_id).await,
            CartAction::Clear => cart::clear(&state).await,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::Categories => catalog::categories(&state).await,
            CatalogAction::Products { category, limit } => {
                catalog::products(&state, category, limit).await
            }
            CatalogAction::Product { id } => catalog::product(&state, &id).await,
        },
        Commands::Checkout { user } => orders::checkout(&state, &user).await,
        Commands::Orders { user } => orders::list(&state, &user).await,
        Commands::Store { action } => match action {
            StoreAction::Status => store::status(&state),
        },
    }
}
