//! Domain models for the storefront.
//!
//! These are the shapes held by the stores in [`crate::db`] and returned by
//! the services. Catalog data lives in [`crate::catalog`].

pub mod cart;
pub mod order;
pub mod user;

pub use cart::{CartEntry, CartLine, CartOwner, CartUpdate, CartView};
pub use order::{Order, PendingCheckout};
pub use user::{PublicUser, User};
