//! Webhook signing for local testing.
//!
//! Produces a `Stripe-Signature` header value for a payload file, so a
//! locally running server can be exercised with `curl`:
//!
//! ```bash
//! SIG=$(veltr webhook sign --file event.json)
//! curl -X POST localhost:5001/api/webhooks/stripe \
//!     -H "Stripe-Signature: $SIG" --data-binary @event.json
//! ```
//!
//! # Environment Variables
//!
//! - `STRIPE_WEBHOOK_SECRET` - Signing secret when `--secret` is omitted

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use veltr_storefront::stripe::webhook::sign_payload;

/// Errors that can occur while signing payloads.
#[derive(Debug, Error)]
pub enum WebhookSignError {
    /// No secret on the command line or in the environment.
    #[error("Missing environment variable: STRIPE_WEBHOOK_SECRET")]
    MissingSecret,

    /// The payload file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Sign the payload in `file` with the current time and print the header.
///
/// # Errors
///
/// Returns `WebhookSignError` if no secret is available or the file cannot
/// be read.
#[allow(clippy::print_stdout)]
pub fn sign(file: &Path, secret: Option<&str>) -> Result<(), WebhookSignError> {
    let secret = match secret {
        Some(secret) => secret.to_string(),
        None => std::env::var("STRIPE_WEBHOOK_SECRET")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(WebhookSignError::MissingSecret)?,
    };

    let payload = std::fs::read(file).map_err(|source| WebhookSignError::Read {
        path: file.to_path_buf(),
        source,
    })?;

    println!("{}", sign_payload(&secret, Utc::now().timestamp(), &payload));
    Ok(())
}
