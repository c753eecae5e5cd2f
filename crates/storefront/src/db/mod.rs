//! Storage for users, carts, orders and pending checkouts.
//!
//! # Stores
//!
//! - [`UserStore`] - Registered customers, unique by normalized email
//! - [`CartStore`] - One cart per [`CartOwner`](crate::models::CartOwner)
//! - [`OrderStore`] - Paid orders, unique by checkout session id
//! - [`PendingCheckoutStore`] - Provider sessions awaiting payment
//!
//! Each store is a trait so the process-local implementations here can be
//! swapped for a database without touching the services. The in-memory
//! implementations guard their maps with `tokio::sync::RwLock`; anything that
//! must be atomic (email uniqueness, create-if-absent, take) happens under a
//! single write guard.

pub mod carts;
pub mod checkout_sessions;
pub mod orders;
pub mod users;

use thiserror::Error;

pub use carts::{CartStore, MemoryCartStore};
pub use checkout_sessions::{MemoryPendingCheckoutStore, PendingCheckoutStore};
pub use orders::{MemoryOrderStore, OrderInsert, OrderStore};
pub use users::{MemoryUserStore, UserStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store cannot take the write right now (unreachable or full).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
