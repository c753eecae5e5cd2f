//! User storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use veltr_core::{Email, UserId};

use super::RepositoryError;
use crate::models::User;

/// Storage for registered users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    async fn insert(&self, user: User) -> Result<User, RepositoryError>;

    /// Get a user by normalized email.
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Get a user by ID.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
}

#[derive(Default)]
struct UsersInner {
    by_id: HashMap<UserId, User>,
    by_email: HashMap<Email, UserId>,
}

/// Process-local user store.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<UsersInner>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, RepositoryError> {
        let mut inner = self.inner.write().await;

        if inner.by_email.contains_key(&user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        inner.by_email.insert(user.email.clone(), user.id);
        inner.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_email
            .get(email)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }
}
