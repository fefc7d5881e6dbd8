//! Catalog fixtures: a YAML file standing in for the remote database.
//!
//! ```yaml
//! categories:
//!   - id: dogs
//!     name: Dogs
//! products:
//!   - id: p1
//!     name: Kibble
//!     price: "25.50"
//!     stock: 12
//!     category: dogs
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use petshop_cart::models::{Category, Product};
use petshop_cart::remote::InMemoryRemote;
use petshop_core::{CategoryId, Price, ProductId};

/// Errors loading a catalog fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),
}

#[derive(Debug, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    categories: Vec<CategoryEntry>,
    #[serde(default)]
    products: Vec<ProductEntry>,
}

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    id: String,
    name: String,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductEntry {
    id: String,
    name: String,
    price: Price,
    #[serde(default)]
    stock: u32,
    category: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl CatalogFixture {
    /// Every problem with the fixture, empty if it is usable.
    ///
    /// Product ids must be unique: two products sharing an id would merge
    /// into a single cart line.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut category_ids = HashSet::new();
        for category in &self.categories {
            if category.id.trim().is_empty() {
                errors.push(format!("category `{}` has a blank id", category.name));
            } else if !category_ids.insert(category.id.as_str()) {
                errors.push(format!("duplicate category id `{}`", category.id));
            }
        }

        let mut product_ids = HashSet::new();
        for product in &self.products {
            if product.id.trim().is_empty() {
                errors.push(format!("product `{}` has a blank id", product.name));
            } else if !product_ids.insert(product.id.as_str()) {
                errors.push(format!("duplicate product id `{}`", product.id));
            }
            if !category_ids.contains(product.category.as_str()) {
                errors.push(format!(
                    "product `{}` references unknown category `{}`",
                    product.id, product.category
                ));
            }
        }

        errors
    }

    /// Load the fixture into an in-memory remote.
    #[must_use]
    pub fn into_remote(self) -> InMemoryRemote {
        let remote = InMemoryRemote::new();
        for entry in self.categories {
            remote.insert_category(Category {
                id: CategoryId::new(entry.id),
                name: entry.name,
                image_url: entry.image_url,
            });
        }
        for entry in self.products {
            remote.insert_product(Product {
                id: ProductId::new(entry.id),
                name: entry.name,
                price: entry.price,
                stock: entry.stock,
                category: CategoryId::new(entry.category),
                image_url: entry.image_url,
                description: entry.description,
            });
        }
        remote
    }
}

/// Read, validate and load a fixture file.
///
/// # Errors
///
/// Returns `FixtureError` if the file cannot be read, is not valid YAML, or
/// fails validation.
pub async fn load(path: &Path) -> Result<InMemoryRemote, FixtureError> {
    info!(path = %path.display(), "Loading catalog fixture");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let fixture: CatalogFixture = serde_yaml::from_str(&content)?;

    let errors = fixture.validate();
    if !errors.is_empty() {
        error!("Catalog fixture validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(FixtureError::Invalid(errors.len()));
    }

    info!(
        categories = fixture.categories.len(),
        products = fixture.products.len(),
        "Catalog fixture loaded"
    );
    Ok(fixture.into_remote())
}
