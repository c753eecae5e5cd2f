//! VELTR Core - Shared domain types.
//!
//! This crate provides common types used across all VELTR components:
//! - `storefront` - REST API for the catalog, carts, auth, checkout and orders
//! - `cli` - Developer tooling (catalog checks, tokens, webhook signing)
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, quantities and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
