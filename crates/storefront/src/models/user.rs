//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use veltr_core::{Email, UserId};

/// A registered customer.
///
/// `Debug` is implemented manually so the password hash never reaches logs.
#[derive(Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name as entered at registration.
    pub name: String,
    /// Normalized (trimmed, lowercased) email address.
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// The user shape exposed over the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: UserId::generate(),
            name: "Mara".to_string(),
            email: Email::parse("mara@veltr.audio").unwrap(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_debug_redacts_hash() {
        let output = format!("{:?}", user());
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("argon2id"));
    }

    #[test]
    fn test_public_user_has_no_hash() {
        let json = serde_json::to_value(PublicUser::from(&user())).unwrap();
        assert_eq!(json["email"], "mara@veltr.audio");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
