//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span and returned in the response)
//! 4. CORS (frontend origin only)
//! 5. Security headers
//! 6. Rate limiting on the auth and guest cart routes (governor)
//!
//! Authentication is not a layer: handlers opt in with the
//! [`RequireAuth`] extractor.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::RequireAuth;
pub use rate_limit::{auth_rate_limiter, guest_cart_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
