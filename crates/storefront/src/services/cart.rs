//! Cart service.
//!
//! Validates client-supplied cart items against the catalog and applies
//! them to the cart store. Validation is all-or-nothing: a request with one
//! bad item changes nothing.

use serde_json::Value;
use thiserror::Error;

use veltr_core::{GuestCartKey, ProductId, Quantity, UserId};

use crate::catalog::Catalog;
use crate::db::{CartStore, RepositoryError};
use crate::models::{CartEntry, CartOwner, CartUpdate, CartView};

const MAX_GUEST_KEY_LENGTH: usize = 64;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("items must be an array")]
    ItemsNotArray,

    #[error("productId is required for cart items")]
    MissingProductId,

    #[error("qty must be a positive integer")]
    InvalidQuantity,

    #[error("qty must be an integer")]
    QuantityNotInteger,

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Invalid guest cart key")]
    InvalidGuestKey,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart service bound to a store and the catalog.
pub struct CartService<'a> {
    carts: &'a dyn CartStore,
    catalog: &'a Catalog,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(carts: &'a dyn CartStore, catalog: &'a Catalog) -> Self {
        Self { carts, catalog }
    }

    /// The owner's cart priced from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn get(&self, owner: &CartOwner) -> Result<CartView, CartError> {
        let entries = self.carts.get(owner).await?;
        Ok(CartView::price(&entries, self.catalog))
    }

    /// Replace the owner's cart with `items`.
    ///
    /// # Errors
    ///
    /// Returns a validation `CartError` if any item is malformed or unknown.
    #[tracing::instrument(skip(self, items), fields(owner = %owner))]
    pub async fn replace(
        &self,
        owner: &CartOwner,
        items: Option<&Value>,
    ) -> Result<CartView, CartError> {
        let entries = parse_items(items, self.catalog)?;
        let stored = self
            .carts
            .update(owner, CartUpdate::Replace(entries))
            .await?;
        Ok(CartView::price(&stored, self.catalog))
    }

    /// Merge `items` and, if given, a guest cart into a user's cart.
    ///
    /// The guest cart is emptied by the merge, so repeating the call with the
    /// same key adds nothing further.
    ///
    /// # Errors
    ///
    /// Returns a validation `CartError` if any item or the key is malformed.
    #[tracing::instrument(skip(self, items))]
    pub async fn merge_into_user(
        &self,
        user_id: UserId,
        items: Option<&Value>,
        guest_key: Option<&str>,
    ) -> Result<CartView, CartError> {
        let mut incoming = parse_items(items, self.catalog)?;
        let guest = guest_key.map(guest_owner).transpose()?;

        if let Some(guest) = guest {
            let guest_entries = self.carts.take(&guest).await?;
            if !guest_entries.is_empty() {
                tracing::info!(lines = guest_entries.len(), "merging guest cart");
            }
            // Guest lines first so their order is kept
            incoming.splice(0..0, guest_entries);
        }

        let owner = CartOwner::User(user_id);
        let stored = self
            .carts
            .update(&owner, CartUpdate::Merge(incoming))
            .await?;
        Ok(CartView::price(&stored, self.catalog))
    }

    /// Set a single line's quantity. Zero or below removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` for products outside the catalog
    /// and `CartError::QuantityNotInteger` for a non-integer quantity.
    #[tracing::instrument(skip(self, qty), fields(owner = %owner))]
    pub async fn set_quantity(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        qty: Option<&Value>,
    ) -> Result<CartView, CartError> {
        let qty = qty
            .and_then(integer_value)
            .ok_or(CartError::QuantityNotInteger)?;

        if self.catalog.product(&product_id).is_none() {
            return Err(CartError::ProductNotFound(product_id));
        }

        let qty = if qty <= 0 {
            None
        } else {
            Some(Quantity::new(qty).map_err(|_| CartError::InvalidQuantity)?)
        };

        let stored = self
            .carts
            .update(owner, CartUpdate::SetQuantity { product_id, qty })
            .await?;
        Ok(CartView::price(&stored, self.catalog))
    }
}

/// Validate a guest cart key taken from a URL or request body.
///
/// # Errors
///
/// Returns `CartError::InvalidGuestKey` for empty, overlong, or non
/// `[A-Za-z0-9-]` keys.
pub fn guest_owner(key: &str) -> Result<CartOwner, CartError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_GUEST_KEY_LENGTH
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');

    if valid {
        Ok(CartOwner::Guest(GuestCartKey::new(key)))
    } else {
        Err(CartError::InvalidGuestKey)
    }
}

/// Parse and validate a client `items` array.
///
/// Each item needs `productId` (or `id`) and a positive integer `qty` (or
/// `quantity`); numeric strings are accepted. Any other fields, including a
/// client-sent price, are ignored. An absent list means no items.
///
/// # Errors
///
/// Returns the first validation failure in item order.
pub fn parse_items(items: Option<&Value>, catalog: &Catalog) -> Result<Vec<CartEntry>, CartError> {
    let items = match items {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(CartError::ItemsNotArray),
    };

    items
        .iter()
        .map(|item| {
            let product_id = field(item, "productId", "id")
                .and_then(product_id_value)
                .ok_or(CartError::MissingProductId)?;

            let qty = field(item, "qty", "quantity")
                .and_then(integer_value)
                .ok_or(CartError::InvalidQuantity)
                .and_then(|n| Quantity::new(n).map_err(|_| CartError::InvalidQuantity))?;

            if catalog.product(&product_id).is_none() {
                return Err(CartError::ProductNotFound(product_id));
            }

            Ok(CartEntry::new(product_id, qty))
        })
        .collect()
}

/// `item[primary]`, falling back to `item[alias]` when absent or null.
fn field<'v>(item: &'v Value, primary: &str, alias: &str) -> Option<&'v Value> {
    item.get(primary)
        .filter(|v| !v.is_null())
        .or_else(|| item.get(alias))
        .filter(|v| !v.is_null())
}

fn product_id_value(value: &Value) -> Option<ProductId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(ProductId::new(s.as_str())),
        Value::Number(n) => Some(ProductId::new(n.to_string())),
        _ => None,
    }
}

/// An integral JSON number or numeric string.
fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| {
                    #[allow(clippy::cast_possible_truncation)] // bounded above
                    let whole = f as i64;
                    whole
                })
        }),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| integer_value(&Value::from(trimmed.parse::<f64>().ok()?)))
        }
        _ => None,
    }
}
