//! VELTR storefront API library.
//!
//! This crate provides the storefront REST API as a library, allowing it to
//! be driven in-process by tests and reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;

use axum::{
    Router,
    body::Body,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::middleware::request_id::REQUEST_ID_HEADER;
use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Build the full application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    let config = state.config().clone();

    Router::new()
        .merge(routes::routes(&config))
        .fallback(not_found)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(cors_layer(&config.frontend_origin()))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = tracing::field::Empty,
                user_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// CORS for the single-page app's origin.
fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!(error = %e, origin, "frontend origin is not a valid header, CORS disabled");
            cors
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound
}
