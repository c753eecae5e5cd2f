//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; every error body is `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::checkout::CheckoutError;
use crate::stripe::WebhookError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Catalog query or load failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout operation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found")]
    NotFound,

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Too many requests")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::Unavailable(_))
            | Self::Cart(CartError::Repository(RepositoryError::Unavailable(_))) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Catalog(err) => match err {
                CatalogError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::MissingFields(_)
                | AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials
                | AuthError::MissingAuthorization
                | AuthError::InvalidAuthorizationFormat
                | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::TokenSigning(_) | AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Cart(err) => match err {
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Checkout(err) => match err {
                CheckoutError::NotConfigured
                | CheckoutError::AmountOutOfRange(_)
                | CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CheckoutError::Provider(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::SessionNotFound => StatusCode::NOT_FOUND,
                CheckoutError::EmptyCart
                | CheckoutError::UnknownShippingRate(_)
                | CheckoutError::MissingSessionId
                | CheckoutError::PaymentIncomplete
                | CheckoutError::Webhook(_) => StatusCode::BAD_REQUEST,
            },
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message shown to the client.
    ///
    /// Server errors are reduced to a generic message; details go to logs
    /// and Sentry only.
    #[must_use]
    pub fn client_message(&self) -> String {
        if self.status() == StatusCode::SERVICE_UNAVAILABLE {
            return "Service temporarily unavailable".to_string();
        }
        match self {
            Self::Auth(err) => match err {
                AuthError::MissingFields(msg) => (*msg).to_string(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::UserAlreadyExists => "Email is already registered".to_string(),
                AuthError::MissingAuthorization => "Missing authorization header".to_string(),
                AuthError::InvalidAuthorizationFormat => {
                    "Invalid authorization format".to_string()
                }
                AuthError::InvalidToken => "Invalid or expired token".to_string(),
                _ => "Internal server error".to_string(),
            },
            Self::Catalog(CatalogError::InvalidQuery(msg)) => msg.clone(),
            Self::Cart(CartError::Repository(_)) => "Internal server error".to_string(),
            Self::Cart(err) => err.to_string(),
            Self::Checkout(err) => match err {
                CheckoutError::Provider(_) => "Payment provider error".to_string(),
                CheckoutError::AmountOutOfRange(_) | CheckoutError::Repository(_) => {
                    "Internal server error".to_string()
                }
                CheckoutError::Webhook(
                    e @ (WebhookError::NotConfigured | WebhookError::MissingSignature),
                ) => e.to_string(),
                CheckoutError::Webhook(e) => format!("Webhook error: {e}"),
                _ => err.to_string(),
            },
            Self::NotFound | Self::BadRequest(_) | Self::RateLimited => self.to_string(),
            Self::Database(_) | Self::Catalog(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = Json(json!({ "error": self.client_message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called after bearer authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;
    use crate::stripe::StripeError;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let (status, body) = render(AppError::NotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found"}));
    }

    #[tokio::test]
    async fn test_auth_statuses_and_messages() {
        let (status, body) = render(AuthError::UserAlreadyExists.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Email is already registered");

        let (status, body) = render(AuthError::InvalidCredentials.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");

        let (status, body) = render(AuthError::MissingAuthorization.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing authorization header");

        let (status, body) =
            render(AuthError::MissingFields("Email and password are required").into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email and password are required");
    }

    #[tokio::test]
    async fn test_cart_validation_is_bad_request() {
        let (status, body) = render(CartError::ItemsNotArray.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "items must be an array");
    }

    #[tokio::test]
    async fn test_checkout_statuses() {
        let (status, body) = render(CheckoutError::NotConfigured.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Stripe is not configured");

        let (status, _) = render(CheckoutError::SessionNotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = render(CheckoutError::PaymentIncomplete.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Payment has not completed yet");

        let provider = StripeError::Api {
            status: 401,
            message: "Invalid API Key provided: sk_live_****".to_string(),
        };
        let (status, body) = render(CheckoutError::Provider(provider).into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Payment provider error");
    }

    #[tokio::test]
    async fn test_webhook_messages() {
        let (status, body) =
            render(CheckoutError::Webhook(WebhookError::MissingSignature).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing signature");

        let (_, body) = render(CheckoutError::Webhook(WebhookError::SignatureMismatch).into()).await;
        assert_eq!(
            body["error"],
            "Webhook error: No signatures found matching the expected signature for payload"
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) =
            render(AppError::Database(RepositoryError::Conflict("users_email_key".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_full_store_is_unavailable() {
        let full = RepositoryError::Unavailable("guest cart capacity reached".into());
        let (status, body) = render(CartError::Repository(full).into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"error": "Service temporarily unavailable"}));
    }
}
