//! Pending checkout storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use veltr_core::CheckoutSessionId;

use super::RepositoryError;
use crate::models::PendingCheckout;

/// Storage for provider sessions that have not been finalized.
#[async_trait]
pub trait PendingCheckoutStore: Send + Sync {
    /// Record a new pending checkout, replacing any with the same session id.
    async fn insert(&self, pending: PendingCheckout) -> Result<(), RepositoryError>;

    /// Get a pending checkout without consuming it.
    async fn get(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Option<PendingCheckout>, RepositoryError>;

    /// Remove and return a pending checkout.
    async fn take(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Option<PendingCheckout>, RepositoryError>;
}

/// Process-local pending checkout store.
#[derive(Default)]
pub struct MemoryPendingCheckoutStore {
    sessions: RwLock<HashMap<CheckoutSessionId, PendingCheckout>>,
}

impl MemoryPendingCheckoutStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingCheckoutStore for MemoryPendingCheckoutStore {
    async fn insert(&self, pending: PendingCheckout) -> Result<(), RepositoryError> {
        self.sessions
            .write()
            .await
            .insert(pending.session_id.clone(), pending);
        Ok(())
    }

    async fn get(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Option<PendingCheckout>, RepositoryError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn take(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Option<PendingCheckout>, RepositoryError> {
        Ok(self.sessions.write().await.remove(session_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::CartView;
    use veltr_core::{Price, UserId};

    fn pending(id: &str) -> PendingCheckout {
        PendingCheckout::new(
            CheckoutSessionId::new(id),
            UserId::generate(),
            CartView {
                items: Vec::new(),
                subtotal: Price::ZERO,
            },
            None,
            Price::ZERO,
        )
    }

    #[tokio::test]
    async fn test_take_consumes_once() {
        let store = MemoryPendingCheckoutStore::new();
        let id = CheckoutSessionId::new("cs_take");
        store.insert(pending("cs_take")).await.unwrap();

        assert!(store.get(&id).await.unwrap().is_some());
        assert!(store.take(&id).await.unwrap().is_some());
        assert!(store.take(&id).await.unwrap().is_none());
        assert!(store.get(&id).await.unwrap().is_none());
    }
}
