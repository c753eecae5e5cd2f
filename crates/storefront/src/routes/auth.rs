//! Authentication route handlers.
//!
//! Email/password registration and login return `{user, token}`; the SPA
//! sends the token back as `Authorization: Bearer <token>`.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use super::ApiJson;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::PublicUser;
use crate::services::AuthSession;
use crate::state::AppState;

/// Registration request body.
#[derive(Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login request body.
#[derive(Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Create an account and sign it in.
#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterBody>,
) -> Result<Json<AuthSession>> {
    let session = state
        .auth()
        .register(&body.name, &body.email, &body.password)
        .await?;

    Ok(Json(session))
}

/// Sign in with email and password.
#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginBody>,
) -> Result<Json<AuthSession>> {
    let session = state.auth().login(&body.email, &body.password).await?;
    Ok(Json(session))
}

/// The signed-in user.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn me(RequireAuth(user): RequireAuth) -> Json<Value> {
    Json(json!({ "user": PublicUser::from(&user) }))
}
