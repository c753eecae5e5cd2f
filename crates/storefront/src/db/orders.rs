//! Order storage.
//!
//! Orders are keyed by checkout session id. [`OrderStore::create_if_absent`]
//! is the single point where the confirm endpoint and the provider webhook
//! meet: whichever calls it first creates the order, the other gets it back.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use veltr_core::{CheckoutSessionId, UserId};

use super::RepositoryError;
use crate::models::Order;

/// Outcome of [`OrderStore::create_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderInsert {
    /// This call stored the order.
    Created(Order),
    /// An order for the session already existed; it is returned unchanged.
    Existing(Order),
}

impl OrderInsert {
    /// The stored order, whichever call created it.
    #[must_use]
    pub fn into_order(self) -> Order {
        match self {
            Self::Created(order) | Self::Existing(order) => order,
        }
    }
}

/// Append-only storage for paid orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Store `order` unless one already exists for its session id.
    async fn create_if_absent(&self, order: Order) -> Result<OrderInsert, RepositoryError>;

    /// Get the order created for a checkout session.
    async fn get_by_session(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Option<Order>, RepositoryError>;

    /// All orders for a user, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;
}

#[derive(Default)]
struct OrdersInner {
    by_session: HashMap<CheckoutSessionId, Order>,
    by_user: HashMap<UserId, Vec<CheckoutSessionId>>,
}

/// Process-local order store.
#[derive(Default)]
pub struct MemoryOrderStore {
    inner: RwLock<OrdersInner>,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create_if_absent(&self, order: Order) -> Result<OrderInsert, RepositoryError> {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.by_session.get(&order.session_id) {
            return Ok(OrderInsert::Existing(existing.clone()));
        }

        inner
            .by_user
            .entry(order.user_id)
            .or_default()
            .push(order.session_id.clone());
        inner.by_session.insert(order.session_id.clone(), order.clone());
        Ok(OrderInsert::Created(order))
    }

    async fn get_by_session(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self.inner.read().await.by_session.get(session_id).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut orders: Vec<Order> = inner
            .by_user
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|session_id| inner.by_session.get(session_id))
            .cloned()
            .collect();

        // Insertion order is oldest first; equal timestamps stay newest first
        orders.reverse();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
