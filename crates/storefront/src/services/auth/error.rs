//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field was empty or absent.
    #[error("{0}")]
    MissingFields(&'static str),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] veltr_core::EmailError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// No `Authorization` header on a protected request.
    #[error("missing authorization header")]
    MissingAuthorization,

    /// `Authorization` header is not `Bearer <token>`.
    #[error("invalid authorization format")]
    InvalidAuthorizationFormat,

    /// Token failed verification, expired, or names an unknown user.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Token could not be signed.
    #[error("token signing error: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
