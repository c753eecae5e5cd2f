//! Bearer token authentication extractor.
//!
//! Protected handlers take [`RequireAuth`]. Guest carts are keyed by their
//! guest key instead and need no extractor.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::AuthError;
use crate::state::AppState;

/// Extractor that requires a valid `Authorization: Bearer <token>` header.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthError::MissingAuthorization)?;
        let user = state.auth().authenticate(token).await?;

        tracing::Span::current().record("user_id", tracing::field::display(user.id));
        set_sentry_user(&user.id);

        Ok(Self(user))
    }
}

/// The token from an `Authorization: Bearer` header, if the header is present.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorizationFormat)?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme == "Bearer" && !token.trim().is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(AuthError::InvalidAuthorizationFormat),
    }
}
