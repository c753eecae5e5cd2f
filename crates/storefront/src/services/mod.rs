//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login and bearer token resolution
//! - `cart` - Cart validation, merge and quantity updates
//! - `checkout` - Stripe checkout sessions and order finalization
//!
//! Services borrow their stores from [`AppState`](crate::state::AppState) for
//! the length of one request.

pub mod auth;
pub mod cart;
pub mod checkout;

pub use auth::{AuthError, AuthService, AuthSession, TokenIssuer};
pub use cart::{CartError, CartService};
pub use checkout::{CheckoutError, CheckoutService, CheckoutStarted, WebhookOutcome};
