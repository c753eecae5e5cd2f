//! Cart storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::RepositoryError;
use crate::models::{CartEntry, CartOwner, CartUpdate};

/// Storage for carts, one per owner.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Stored entries for `owner`; empty if there is no cart.
    async fn get(&self, owner: &CartOwner) -> Result<Vec<CartEntry>, RepositoryError>;

    /// Apply `update` atomically and return the resulting entries.
    async fn update(
        &self,
        owner: &CartOwner,
        update: CartUpdate,
    ) -> Result<Vec<CartEntry>, RepositoryError>;

    /// Remove the cart for `owner`, returning what it held.
    async fn take(&self, owner: &CartOwner) -> Result<Vec<CartEntry>, RepositoryError>;
}

/// Guest carts held before new ones are refused.
pub const DEFAULT_GUEST_CART_CAPACITY: usize = 10_000;

/// Process-local cart store.
///
/// User carts are unbounded (one per account). Guest carts can be created by
/// anyone, so their number is capped; once full, only existing guest carts
/// can be written until some are emptied or merged.
pub struct MemoryCartStore {
    carts: RwLock<HashMap<CartOwner, Vec<CartEntry>>>,
    guest_capacity: usize,
}

impl Default for MemoryCartStore {
    fn default() -> Self {
        Self::with_guest_capacity(DEFAULT_GUEST_CART_CAPACITY)
    }
}

impl MemoryCartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_guest_capacity(guest_capacity: usize) -> Self {
        Self {
            carts: RwLock::new(HashMap::new()),
            guest_capacity,
        }
    }
}

fn guest_count(carts: &HashMap<CartOwner, Vec<CartEntry>>) -> usize {
    carts
        .keys()
        .filter(|owner| matches!(owner, CartOwner::Guest(_)))
        .count()
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn get(&self, owner: &CartOwner) -> Result<Vec<CartEntry>, RepositoryError> {
        Ok(self
            .carts
            .read()
            .await
            .get(owner)
            .cloned()
            .unwrap_or_default())
    }

    async fn update(
        &self,
        owner: &CartOwner,
        update: CartUpdate,
    ) -> Result<Vec<CartEntry>, RepositoryError> {
        let mut carts = self.carts.write().await;
        let existing = carts.remove(owner);
        let is_new = existing.is_none();
        let mut entries = existing.unwrap_or_default();
        update.apply(&mut entries);

        if entries.is_empty() {
            return Ok(entries);
        }
        if is_new
            && matches!(owner, CartOwner::Guest(_))
            && guest_count(&carts) >= self.guest_capacity
        {
            tracing::warn!(capacity = self.guest_capacity, "guest cart capacity reached");
            return Err(RepositoryError::Unavailable(
                "guest cart capacity reached".to_string(),
            ));
        }

        carts.insert(owner.clone(), entries.clone());
        Ok(entries)
    }

    async fn take(&self, owner: &CartOwner) -> Result<Vec<CartEntry>, RepositoryError> {
        Ok(self.carts.write().await.remove(owner).unwrap_or_default())
    }
}
