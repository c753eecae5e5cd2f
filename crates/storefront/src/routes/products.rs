//! Catalog route handlers.
//!
//! Read-only endpoints over the in-memory catalog. No authentication.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::header::CACHE_CONTROL,
    response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::instrument;

use veltr_core::ProductId;

use crate::catalog::{ProductPage, ProductQuery, ProductQueryParams};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Static catalog data may be cached briefly by browsers.
const CATALOG_CACHE: &str = "public, max-age=60";

/// Liveness check.
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "service": "veltr-backend" }))
}

/// List product categories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CACHE_CONTROL, CATALOG_CACHE)],
        Json(json!({ "categories": state.catalog().categories() })),
    )
}

/// List shipping rates.
#[instrument(skip(state))]
pub async fn shipping_rates(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CACHE_CONTROL, CATALOG_CACHE)],
        Json(json!({ "rates": state.catalog().shipping_rates() })),
    )
}

/// Filtered, sorted, paginated product listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ProductQueryParams>,
) -> Result<Json<ProductPage>> {
    let query = ProductQuery::try_from(params)?;
    Ok(Json(state.catalog().search(&query)))
}

/// Product detail.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let product = state
        .catalog()
        .product(&ProductId::new(id))
        .ok_or(AppError::NotFound)?;

    Ok(Json(json!({ "product": product })))
}
