//! Authentication service.
//!
//! Email/password accounts with Argon2id hashes, and HS256 bearer tokens.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, TokenIssuer};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use serde::Serialize;

use veltr_core::{Email, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::{PublicUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// A signed-in user and their bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: PublicUser,
    pub token: String,
}

/// Authentication service.
///
/// Handles user registration, login, and bearer token resolution.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    tokens: &'a TokenIssuer,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, tokens: &'a TokenIssuer) -> Self {
        Self { users, tokens }
    }

    /// Register a new user with name, email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if any field is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[tracing::instrument(skip(self, name, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let name = name.trim();
        if name.is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields(
                "Name, email, and password are required",
            ));
        }

        // Validate email
        let email = Email::parse(email)?;

        // Fail fast before paying for a hash
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        // Validate password
        validate_password(password)?;

        // Hash password
        let password_hash = hash_password(password)?;

        // Create user
        let user = self
            .users
            .insert(User {
                id: UserId::generate(),
                name: name.to_owned(),
                email,
                password_hash,
                created_at: Utc::now(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        self.session_for(&user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if either field is blank.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields("Email and password are required"));
        }

        // A malformed address cannot belong to an account
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // Verify password
        verify_password(password, &user.password_hash)?;

        self.session_for(&user)
    }

    /// Resolve a bearer token to the user it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token fails verification or
    /// its user no longer exists.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.verify(token)?;

        self.users
            .get_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    fn session_for(&self, user: &User) -> Result<AuthSession, AuthError> {
        Ok(AuthSession {
            user: PublicUser::from(user),
            token: self.tokens.issue(user.id)?,
        })
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::db::MemoryUserStore;

    fn fixtures() -> (MemoryUserStore, TokenIssuer) {
        (
            MemoryUserStore::new(),
            TokenIssuer::new(&JwtConfig::development()),
        )
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }

    #[tokio::test]
    async fn test_register_normalizes_email_and_issues_token() {
        let (users, tokens) = fixtures();
        let auth = AuthService::new(&users, &tokens);

        let session = auth
            .register("  Mara  ", " Mara@VELTR.audio ", "listening-room")
            .await
            .unwrap();

        assert_eq!(session.user.name, "Mara");
        assert_eq!(session.user.email.as_str(), "mara@veltr.audio");
        let resolved = auth.authenticate(&session.token).await.unwrap();
        assert_eq!(resolved.id, session.user.id);
    }

    #[tokio::test]
    async fn test_register_requires_all_fields() {
        let (users, tokens) = fixtures();
        let auth = AuthService::new(&users, &tokens);

        let err = auth
            .register("", "a@veltr.audio", "password1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Name, email, and password are required");
        assert!(matches!(
            auth.register("A", "  ", "password1").await,
            Err(AuthError::MissingFields(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let (users, tokens) = fixtures();
        let auth = AuthService::new(&users, &tokens);

        auth.register("A", "dup@veltr.audio", "password1")
            .await
            .unwrap();
        let result = auth.register("B", "DUP@veltr.audio", "password2").await;
        assert!(matches!(result, Err(AuthError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (users, tokens) = fixtures();
        let auth = AuthService::new(&users, &tokens);
        auth.register("A", "known@veltr.audio", "password1")
            .await
            .unwrap();

        let wrong_password = auth.login("known@veltr.audio", "password2").await;
        let unknown_email = auth.login("nobody@veltr.audio", "password1").await;
        let malformed = auth.login("not-an-email", "password1").await;

        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
        assert!(matches!(malformed, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_success() {
        let (users, tokens) = fixtures();
        let auth = AuthService::new(&users, &tokens);
        let registered = auth
            .register("A", "login@veltr.audio", "password1")
            .await
            .unwrap();

        let session = auth.login(" LOGIN@veltr.audio", "password1").await.unwrap();
        assert_eq!(session.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn test_token_for_unknown_user_rejected() {
        let (users, tokens) = fixtures();
        let auth = AuthService::new(&users, &tokens);

        let orphan = tokens.issue(UserId::generate()).unwrap();
        assert!(matches!(
            auth.authenticate(&orphan).await,
            Err(AuthError::InvalidToken)
        ));
    }
}
