//! Cart route handlers.
//!
//! Signed-in carts live under `/api/cart` and are keyed by the bearer
//! token's user. Anonymous carts live under `/api/guest-carts/{key}`, keyed
//! by a server-issued guest key the client keeps in local storage. Every
//! response is the cart re-priced from the catalog.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use veltr_core::{GuestCartKey, ProductId};

use super::{ApiJson, optional_json};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{CartOwner, CartView};
use crate::services::cart::guest_owner;
use crate::state::AppState;

/// Body of a cart replace.
#[derive(Debug, Default, Deserialize)]
pub struct CartItemsBody {
    #[serde(default)]
    pub items: Option<Value>,
}

/// Body of a merge on login.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeBody {
    #[serde(default)]
    pub items: Option<Value>,
    #[serde(default)]
    pub guest_key: Option<String>,
}

/// Body of a single-line quantity update.
#[derive(Debug, Default, Deserialize)]
pub struct QuantityBody {
    #[serde(default)]
    pub qty: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
}

impl QuantityBody {
    fn value(&self) -> Option<&Value> {
        self.qty
            .as_ref()
            .filter(|v| !v.is_null())
            .or(self.quantity.as_ref())
    }
}

// =============================================================================
// Signed-in cart
// =============================================================================

/// Get the user's cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    let cart = state.carts().get(&CartOwner::User(user.id)).await?;
    Ok(Json(cart))
}

/// Replace the user's cart.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn replace(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CartItemsBody>,
) -> Result<Json<CartView>> {
    let cart = state
        .carts()
        .replace(&CartOwner::User(user.id), body.items.as_ref())
        .await?;
    Ok(Json(cart))
}

/// Merge client items and/or a guest cart into the user's cart.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn merge(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: Bytes,
) -> Result<Json<CartView>> {
    let body: MergeBody = optional_json(&body)?;
    let cart = state
        .carts()
        .merge_into_user(user.id, body.items.as_ref(), body.guest_key.as_deref())
        .await?;
    Ok(Json(cart))
}

/// Set one line's quantity in the user's cart.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn set_quantity(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
    ApiJson(body): ApiJson<QuantityBody>,
) -> Result<Json<CartView>> {
    let cart = state
        .carts()
        .set_quantity(
            &CartOwner::User(user.id),
            ProductId::new(product_id),
            body.value(),
        )
        .await?;
    Ok(Json(cart))
}

// =============================================================================
// Guest carts
// =============================================================================

/// Issue a fresh guest cart key.
///
/// Nothing is stored until the first write to the key.
#[instrument]
pub async fn create_guest() -> (StatusCode, Json<Value>) {
    let key = GuestCartKey::generate();
    (StatusCode::CREATED, Json(json!({ "guestKey": key })))
}

/// Get a guest cart. Unknown keys read as empty.
#[instrument(skip(state))]
pub async fn show_guest(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CartView>> {
    let owner = guest_owner(&key)?;
    Ok(Json(state.carts().get(&owner).await?))
}

/// Replace a guest cart.
#[instrument(skip(state, body))]
pub async fn replace_guest(
    State(state): State<AppState>,
    Path(key): Path<String>,
    ApiJson(body): ApiJson<CartItemsBody>,
) -> Result<Json<CartView>> {
    let owner = guest_owner(&key)?;
    let cart = state.carts().replace(&owner, body.items.as_ref()).await?;
    Ok(Json(cart))
}

/// Set one line's quantity in a guest cart.
#[instrument(skip(state, body))]
pub async fn set_guest_quantity(
    State(state): State<AppState>,
    Path((key, product_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<QuantityBody>,
) -> Result<Json<CartView>> {
    let owner = guest_owner(&key)?;
    let cart = state
        .carts()
        .set_quantity(&owner, ProductId::new(product_id), body.value())
        .await?;
    Ok(Json(cart))
}
