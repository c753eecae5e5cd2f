//! Bearer token commands.
//!
//! # Usage
//!
//! ```bash
//! veltr token issue --user-id 7f0c1a5e-2b6d-4d8e-9a43-0c6f5e2b1d77
//! veltr token issue --user-id 7f0c1a5e-2b6d-4d8e-9a43-0c6f5e2b1d77 --days 1
//! ```
//!
//! # Environment Variables
//!
//! - `JWT_SECRET` - Token signing secret
//! - `JWT_EXPIRY_DAYS` - Default token lifetime
//! - `VELTR_ALLOW_DEV_SECRET` - Set to `1` to fall back to the development secret

use thiserror::Error;
use uuid::Uuid;
use veltr_core::UserId;
use veltr_storefront::config::{ConfigError, JwtConfig, MAX_TOKEN_EXPIRY_DAYS};
use veltr_storefront::services::{AuthError, TokenIssuer};

/// Errors that can occur while issuing tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Lifetime outside the accepted range.
    #[error("Invalid lifetime: {0} days (must be between 1 and {max})", max = MAX_TOKEN_EXPIRY_DAYS)]
    InvalidDays(i64),

    /// Signing failed.
    #[error("Failed to sign token: {0}")]
    Signing(#[from] AuthError),
}

/// Issue a bearer token for `user_id` and print it.
///
/// The user is not looked up: user storage lives in the server process.
///
/// # Errors
///
/// Returns `TokenError` if configuration is invalid or signing fails.
#[allow(clippy::print_stdout)]
pub fn issue(user_id: Uuid, days: Option<i64>) -> Result<(), TokenError> {
    let config = JwtConfig::from_env()?;
    let token = issue_with(config, UserId::new(user_id), days)?;

    println!("{token}");
    Ok(())
}

fn issue_with(
    mut config: JwtConfig,
    user_id: UserId,
    days: Option<i64>,
) -> Result<String, TokenError> {
    if let Some(days) = days {
        if !(1..=MAX_TOKEN_EXPIRY_DAYS).contains(&days) {
            return Err(TokenError::InvalidDays(days));
        }
        config.expiry_days = days;
    }

    let token = TokenIssuer::new(&config).issue(user_id)?;
    tracing::info!(%user_id, expiry_days = config.expiry_days, "issued token");
    Ok(token)
}
