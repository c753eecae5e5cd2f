//! Product catalog.
//!
//! The catalog is read-only for the lifetime of the process. It is seeded
//! from the JSON file embedded at build time (`data/catalog.json`) unless
//! `VELTR_CATALOG_PATH` points at another file with the same shape.

mod query;

pub use query::{PageMeta, ProductPage, ProductQuery, ProductQueryParams};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use veltr_core::{CategorySlug, CurrencyCode, Price, ProductId, ShippingRateId};

const SEED_CATALOG: &str = include_str!("../../data/catalog.json");

/// Errors raised while loading or querying the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog file is not valid JSON or has the wrong shape.
    #[error("invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The catalog parsed but failed consistency checks.
    #[error("invalid catalog: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// A listing query parameter was rejected.
    #[error("{0}")]
    InvalidQuery(String),
}

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: CategorySlug,
}

/// A selectable shipping rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRate {
    pub id: ShippingRateId,
    pub label: String,
    pub price: Price,
    pub estimated_days: u32,
}

/// A colour/finish variant. Display data only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub label: String,
    pub hex: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_delta: Option<Price>,
}

/// A customer review shown on the product page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub name: String,
    pub title: String,
    pub body: String,
    pub stars: u8,
    pub date: DateTime<Utc>,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub currency: CurrencyCode,
    pub category: CategorySlug,
    pub image: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub stock: u32,
    pub rating_avg: f64,
    pub rating_count: u32,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    categories: Vec<Category>,
    shipping_rates: Vec<ShippingRate>,
    products: Vec<Product>,
}

/// In-memory catalog with an id index.
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<Category>,
    shipping_rates: Vec<ShippingRate>,
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
}

impl Catalog {
    /// The catalog embedded in the binary.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the embedded seed is malformed.
    pub fn seed() -> Result<Self, CatalogError> {
        Self::from_json_checked(SEED_CATALOG)
    }

    /// Load from `path`, or fall back to the embedded seed.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the file cannot be read, parsed, or fails
    /// consistency checks.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        let Some(path) = path else {
            return Self::seed();
        };

        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_checked(&raw)
    }

    /// Parse a catalog without running consistency checks.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` if the JSON does not match the catalog shape.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        let index = file
            .products
            .iter()
            .enumerate()
            .map(|(position, product)| (product.id.clone(), position))
            .collect();

        Ok(Self {
            categories: file.categories,
            shipping_rates: file.shipping_rates,
            products: file.products,
            index,
        })
    }

    fn from_json_checked(raw: &str) -> Result<Self, CatalogError> {
        let catalog = Self::from_json(raw)?;
        let problems = catalog.problems();
        if problems.is_empty() {
            Ok(catalog)
        } else {
            Err(CatalogError::Invalid(problems))
        }
    }

    /// Consistency problems in this catalog, empty when it is sound.
    ///
    /// Checks: unique product and shipping rate ids, products reference a
    /// known category, prices are positive, review stars within 1..=5.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let known_categories: HashSet<&CategorySlug> =
            self.categories.iter().map(|c| &c.slug).collect();

        let mut seen = HashSet::new();
        for product in &self.products {
            if !seen.insert(&product.id) {
                problems.push(format!("duplicate product id: {}", product.id));
            }
            if !known_categories.contains(&product.category) {
                problems.push(format!(
                    "{}: unknown category {}",
                    product.id, product.category
                ));
            }
            if !product.price.is_positive() {
                problems.push(format!("{}: price must be positive", product.id));
            }
            for review in &product.reviews {
                if !(1..=5).contains(&review.stars) {
                    problems.push(format!(
                        "{}: review {} has {} stars",
                        product.id, review.id, review.stars
                    ));
                }
            }
        }

        let mut seen_rates = HashSet::new();
        for rate in &self.shipping_rates {
            if !seen_rates.insert(&rate.id) {
                problems.push(format!("duplicate shipping rate id: {}", rate.id));
            }
        }

        problems
    }

    /// All products in catalog order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    #[must_use]
    pub fn shipping_rates(&self) -> &[ShippingRate] {
        &self.shipping_rates
    }

    /// Look up a product by id.
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.index
            .get(id)
            .and_then(|position| self.products.get(*position))
    }

    /// Look up a shipping rate by id.
    #[must_use]
    pub fn shipping_rate(&self, id: &ShippingRateId) -> Option<&ShippingRate> {
        self.shipping_rates.iter().find(|rate| &rate.id == id)
    }

    /// Filter, sort and window the product list.
    #[must_use]
    pub fn search(&self, query: &ProductQuery) -> ProductPage {
        query.apply(&self.products)
    }
}
