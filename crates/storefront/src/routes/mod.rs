//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET   /api/health                          - Liveness check
//!
//! # Catalog
//! GET   /api/categories                      - Category list
//! GET   /api/shipping-rates                  - Shipping rate list
//! GET   /api/products                        - Filtered, paginated listing
//! GET   /api/products/{id}                   - Product detail
//!
//! # Cart (bearer)
//! GET   /api/cart                            - Current cart
//! PUT   /api/cart                            - Replace cart
//! POST  /api/cart/merge                      - Merge items / guest cart on login
//! PATCH /api/cart/items/{productId}          - Set one line's quantity
//!
//! # Guest carts (rate limited)
//! POST  /api/guest-carts                     - Issue a guest key
//! GET   /api/guest-carts/{key}               - Guest cart
//! PUT   /api/guest-carts/{key}               - Replace guest cart
//! PATCH /api/guest-carts/{key}/items/{productId} - Set one line's quantity
//!
//! # Auth (rate limited)
//! POST  /api/auth/register                   - Create account
//! POST  /api/auth/login                      - Sign in
//! GET   /api/auth/me                         - Current user (bearer)
//!
//! # Orders & checkout (bearer)
//! GET   /api/orders                          - Order history
//! POST  /api/checkout/session                - Open Stripe checkout
//! GET   /api/checkout/confirm                - Confirm after redirect
//!
//! # Webhooks
//! POST  /api/webhooks/stripe                 - Stripe events (signed)
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    extract::{FromRequest, rejection::JsonRejection},
    routing::{get, patch, post},
};
use serde::de::DeserializeOwned;

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, guest_cart_rate_limiter};
use crate::state::AppState;

/// JSON body extractor whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Parse an optional JSON body; an empty body is the default value.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if a non-empty body is not valid JSON for `T`.
pub fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))
}

/// Create the auth routes router.
pub fn auth_routes(config: &StorefrontConfig) -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let credentials = if config.rate_limit {
        credentials.layer(auth_rate_limiter())
    } else {
        credentials
    };

    credentials.route("/me", get(auth::me))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(products::categories))
        .route("/shipping-rates", get(products::shipping_rates))
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).put(cart::replace))
        .route("/merge", post(cart::merge))
        .route("/items/{product_id}", patch(cart::set_quantity))
}

/// Create the guest cart routes router.
pub fn guest_cart_routes(config: &StorefrontConfig) -> Router<AppState> {
    let guest_carts = Router::new()
        .route("/", post(cart::create_guest))
        .route("/{key}", get(cart::show_guest).put(cart::replace_guest))
        .route("/{key}/items/{product_id}", patch(cart::set_guest_quantity));

    if config.rate_limit {
        guest_carts.layer(guest_cart_rate_limiter())
    } else {
        guest_carts
    }
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/session", post(checkout::create_session))
        .route("/confirm", get(checkout::confirm))
}

/// Create all `/api` routes.
pub fn routes(config: &StorefrontConfig) -> Router<AppState> {
    let api = Router::new()
        .route("/health", get(products::health))
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/guest-carts", guest_cart_routes(config))
        .nest("/auth", auth_routes(config))
        .route("/orders", get(checkout::orders))
        .nest("/checkout", checkout_routes())
        .route("/webhooks/stripe", post(checkout::stripe_webhook));

    Router::new().nest("/api", api)
}
