//! Catalog inspection commands.
//!
//! # Usage
//!
//! ```bash
//! veltr catalog list
//! veltr catalog check --path data/catalog.json
//! ```
//!
//! # Environment Variables
//!
//! - `VELTR_CATALOG_PATH` - Catalog file used when `--path` is omitted

use std::path::{Path, PathBuf};

use thiserror::Error;
use veltr_storefront::catalog::{Catalog, CatalogError};

/// Errors that can occur during catalog commands.
#[derive(Debug, Error)]
pub enum CatalogCommandError {
    /// The catalog file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The catalog could not be parsed or loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The catalog parsed but has consistency problems.
    #[error("Catalog has {0} problem(s)")]
    Problems(usize),
}

/// Print every product with its category, price and stock.
///
/// # Errors
///
/// Returns `CatalogCommandError` if the catalog cannot be loaded.
#[allow(clippy::print_stdout)]
pub fn list(path: Option<&Path>) -> Result<(), CatalogCommandError> {
    let catalog = Catalog::load(path)?;

    for row in rows(&catalog) {
        println!("{row}");
    }
    println!();
    println!(
        "{} products, {} categories, {} shipping rates",
        catalog.products().len(),
        catalog.categories().len(),
        catalog.shipping_rates().len()
    );

    Ok(())
}

/// Report consistency problems in a catalog.
///
/// # Errors
///
/// Returns `CatalogCommandError::Problems` if any check fails, or a read or
/// parse error if the file is unusable.
#[allow(clippy::print_stdout)]
pub fn check(path: Option<&Path>) -> Result<(), CatalogCommandError> {
    let catalog = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| CatalogCommandError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            Catalog::from_json(&raw)?
        }
        None => Catalog::seed()?,
    };

    let problems = catalog.problems();
    if problems.is_empty() {
        println!("Catalog OK: {} products", catalog.products().len());
        return Ok(());
    }

    for problem in &problems {
        println!("  - {problem}");
    }
    Err(CatalogCommandError::Problems(problems.len()))
}

fn rows(catalog: &Catalog) -> Vec<String> {
    catalog
        .products()
        .iter()
        .map(|product| {
            format!(
                "{:<24} {:<12} {:>10} stock {:>3}",
                product.id.as_str(),
                product.category.as_str(),
                product.price.to_string(),
                product.stock
            )
        })
        .collect()
}
