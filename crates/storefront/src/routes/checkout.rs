//! Checkout, order and webhook route handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use super::optional_json;
use crate::db::OrderInsert;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::services::WebhookOutcome;
use crate::state::AppState;
use crate::stripe::webhook::SIGNATURE_HEADER;

/// Body of a checkout session request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    #[serde(default)]
    pub shipping_rate_id: Option<String>,
}

/// Query of the success-redirect confirmation.
#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub session_id: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id_alias: Option<String>,
}

/// The user's orders, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>> {
    let orders = state.orders().list_for_user(user.id).await?;
    Ok(Json(json!({ "orders": orders })))
}

/// Open a hosted Stripe checkout for the user's cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: Bytes,
) -> Result<Json<Value>> {
    let body: CheckoutBody = optional_json(&body)?;

    let started = state
        .checkout()
        .create_session(user.id, body.shipping_rate_id.as_deref())
        .await?;

    add_breadcrumb(
        "checkout",
        "Checkout session created",
        Some(&[("session_id", started.session_id.as_str())]),
    );

    Ok(Json(json!({ "url": started.url })))
}

/// Confirm a paid checkout after the success redirect.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn confirm(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ConfirmQuery>,
) -> Result<Json<Value>> {
    let session_id = query.session_id.or(query.session_id_alias);

    let order = state
        .checkout()
        .confirm(user.id, session_id.as_deref())
        .await?;

    Ok(Json(json!({ "order": order })))
}

/// Receive a Stripe webhook.
///
/// The body is taken as raw bytes: the signature covers the exact payload.
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.checkout().handle_webhook(&body, signature).await?;
    if let WebhookOutcome::Finalized(OrderInsert::Existing(order)) = &outcome {
        tracing::debug!(order_id = %order.id, "checkout was already finalized");
    }

    Ok(Json(json!({ "received": true })))
}
