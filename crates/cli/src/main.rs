//! Petshop CLI - drive the cart engine from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! petshop catalog categories
//! petshop catalog products --category dogs
//!
//! # Fill the cart and place an order
//! petshop cart add p1
//! petshop cart inc p1
//! petshop cart show
//! petshop checkout --user u1
//! petshop orders --user u1
//!
//! # Work without the remote database
//! petshop --catalog-file catalog.yaml catalog products --limit 5
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and change the persisted cart
//! - `catalog` - List categories and products
//! - `checkout` - Submit the cart as an order
//! - `orders` - List a user's orders
//! - `store` - Inspect the local cart store

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use petshop_cart::config::CartConfig;

mod commands;
mod fixture;

#[derive(Parser)]
#[command(name = "petshop")]
#[command(author, version, about = "Petshop cart and catalog tools")]
struct Cli {
    /// Serve the catalog and orders from a YAML file instead of the remote
    /// database. Orders placed this way are not kept.
    #[arg(long, global = true, value_name = "FILE")]
    catalog_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Browse the catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Submit the cart as an order
    Checkout {
        /// User placing the order
        #[arg(short, long)]
        user: String,
    },
    /// List a user's orders, most recent first
    Orders {
        /// User whose orders to list
        #[arg(short, long)]
        user: String,
    },
    /// Inspect the local cart store
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart and its totals
    Show,
    /// Add one unit of a product
    Add { product_id: String },
    /// Remove a product's line
    Remove { product_id: String },
    /// Add one unit to a line
    Inc { product_id: String },
    /// Take one unit off a line
    Dec { product_id: String },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List categories
    Categories,
    /// List products
    Products {
        /// Only products in this category (the limit is then ignored)
        #[arg(short, long)]
        category: Option<String>,

        /// At most this many products
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show one product
    Product { id: String },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Report whether the cart survives a restart
    Status,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "petshop_cart=info,petshop_cli=info".into());

    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CartConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    match commands::run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}
