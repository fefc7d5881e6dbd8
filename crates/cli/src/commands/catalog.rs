//! Catalog commands.

use petshop_cart::AppState;
use petshop_cart::fetch::FetchState;
use petshop_cart::models::{Category, Product};
use petshop_cart::remote::{Catalog, ProductQuery, RemoteError};
use petshop_core::{CategoryId, ProductId};

use super::CliError;

#[allow(clippy::print_stdout)]
pub async fn categories(state: &AppState) -> Result<(), CliError> {
    let mut fetch = FetchState::<Vec<Category>>::new();
    fetch.track(state.catalog().list_categories()).await;
    if let Some(error) = fetch.error() {
        return Err(CliError::Fetch(error));
    }

    for category in fetch.data().into_iter().flatten() {
        println!("{}\t{}", category.id, category.name);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn products(
    state: &AppState,
    category: Option<String>,
    limit: Option<u32>,
) -> Result<(), CliError> {
    let query = ProductQuery {
        category_id: category.map(CategoryId::new),
        limit,
    };
    if query.limit.is_some() && query.effective_limit().is_none() {
        tracing::info!("Category filter given, ignoring --limit");
    }

    let products = state.catalog().list_products(&query).await?;
    for product in &products {
        println!("{}", summary(product));
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn product(state: &AppState, id: &str) -> Result<(), CliError> {
    let id = ProductId::new(id);
    let product = state
        .catalog()
        .get_product(&id)
        .await?
        .ok_or_else(|| RemoteError::NotFound(format!("product {id}")))?;

    println!("{}", summary(&product));
    println!("  category: {}", product.category);
    if let Some(description) = &product.description {
        println!("  {description}");
    }
    Ok(())
}

fn summary(product: &Product) -> String {
    format!(
        "{}\t{}\t{}\t{} in stock",
        product.id, product.name, product.price, product.stock
    )
}
