//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - Bearer token signing secret (min 32 chars, high entropy).
//!   May be omitted when `VELTR_ALLOW_DEV_SECRET=1`, in which case a fixed
//!   development secret is used.
//!
//! ## Optional
//! - `VELTR_HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` / `VELTR_PORT` - Listen port (default: 5001)
//! - `FRONTEND_URL` - Public URL of the single-page app; used for checkout
//!   redirects and as the CORS origin (default: <http://localhost:5173>)
//! - `JWT_EXPIRY_DAYS` - Bearer token lifetime in days, 1 to 365 (default: 7)
//! - `STRIPE_SECRET_KEY` - Stripe API secret key; checkout is disabled without it
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook signing secret
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com>)
//! - `VELTR_CATALOG_PATH` - JSON catalog file overriding the embedded seed
//! - `VELTR_RATE_LIMIT` - Set to `off` to disable per-IP rate limiting (default: on)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SIGNING_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_TOKEN_EXPIRY_DAYS: i64 = 7;

/// Longest accepted bearer token lifetime, in days.
pub const MAX_TOKEN_EXPIRY_DAYS: i64 = 365;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

/// Development-only token secret, accepted only with `VELTR_ALLOW_DEV_SECRET`.
pub const DEV_JWT_SECRET: &str = "veltr_dev_secret";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public URL of the single-page app
    pub frontend_url: Url,
    /// Bearer token configuration
    pub jwt: JwtConfig,
    /// Stripe configuration (checkout disabled when absent)
    pub stripe: Option<StripeConfig>,
    /// Optional catalog file overriding the embedded seed
    pub catalog_path: Option<PathBuf>,
    /// Per-IP rate limiting on the auth and guest cart endpoints
    pub rate_limit: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Bearer token signing configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 signing secret
    pub secret: SecretString,
    /// Token lifetime in days
    pub expiry_days: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("expiry_days", &self.expiry_days)
            .finish()
    }
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (server-side only)
    pub secret_key: SecretString,
    /// Webhook signing secret; webhooks are rejected without it
    pub webhook_secret: Option<SecretString>,
    /// API base URL, overridable for stripe-mock
    pub api_base: Url,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("VELTR_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("VELTR_HOST".to_string(), e.to_string()))?;
        let port = get_optional_env("PORT")
            .or_else(|| get_optional_env("VELTR_PORT"))
            .unwrap_or_else(|| "5001".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let frontend_url = get_url("FRONTEND_URL", DEFAULT_FRONTEND_URL)?;

        let jwt = JwtConfig::from_env()?;
        let stripe = StripeConfig::from_env()?;
        let catalog_path = get_optional_env("VELTR_CATALOG_PATH").map(PathBuf::from);
        let rate_limit = !matches!(
            get_env_or_default("VELTR_RATE_LIMIT", "on").to_lowercase().as_str(),
            "off" | "0" | "false"
        );
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            host,
            port,
            frontend_url,
            jwt,
            stripe,
            catalog_path,
            rate_limit,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Local configuration: development token secret, no Stripe, no rate
    /// limiting, embedded catalog.
    ///
    /// # Panics
    ///
    /// Panics if the default frontend URL constant is not a valid URL, which
    /// is a programming error.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn development() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 5001,
            frontend_url: Url::parse(DEFAULT_FRONTEND_URL).expect("valid default frontend URL"),
            jwt: JwtConfig::development(),
            stripe: None,
            catalog_path: None,
            rate_limit: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Browser origin of the frontend, used for CORS.
    #[must_use]
    pub fn frontend_origin(&self) -> String {
        self.frontend_url.origin().ascii_serialization()
    }
}

impl JwtConfig {
    /// Load only the token settings (`JWT_SECRET`, `JWT_EXPIRY_DAYS`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the secret is missing or fails validation, or
    /// the expiry is not an integer in `1..=MAX_TOKEN_EXPIRY_DAYS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let allow_dev = get_optional_env("VELTR_ALLOW_DEV_SECRET").is_some_and(|v| v == "1");

        let secret = match get_optional_env("JWT_SECRET") {
            Some(value) if allow_dev => SecretString::from(value),
            Some(value) => {
                validate_secret_strength(&value, "JWT_SECRET")?;
                let secret = SecretString::from(value);
                validate_signing_secret(&secret, "JWT_SECRET")?;
                secret
            }
            None if allow_dev => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                SecretString::from(DEV_JWT_SECRET)
            }
            None => return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string())),
        };

        let expiry_days = parse_expiry_days(&get_env_or_default("JWT_EXPIRY_DAYS", "7"))?;

        Ok(Self {
            secret,
            expiry_days,
        })
    }

    /// Configuration with the development secret and default lifetime.
    #[must_use]
    pub fn development() -> Self {
        Self {
            secret: SecretString::from(DEV_JWT_SECRET),
            expiry_days: DEFAULT_TOKEN_EXPIRY_DAYS,
        }
    }
}

impl StripeConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(secret_key) = get_optional_env("STRIPE_SECRET_KEY") else {
            return Ok(None);
        };
        validate_secret_strength(&secret_key, "STRIPE_SECRET_KEY")?;

        let webhook_secret = get_optional_env("STRIPE_WEBHOOK_SECRET")
            .map(|value| {
                validate_secret_strength(&value, "STRIPE_WEBHOOK_SECRET")?;
                Ok::<_, ConfigError>(SecretString::from(value))
            })
            .transpose()?;

        Ok(Some(Self {
            secret_key: SecretString::from(secret_key),
            webhook_secret,
            api_base: get_url("STRIPE_API_BASE", "https://api.stripe.com")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse `JWT_EXPIRY_DAYS`.
fn parse_expiry_days(raw: &str) -> Result<i64, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|days| (1..=MAX_TOKEN_EXPIRY_DAYS).contains(days))
        .ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "JWT_EXPIRY_DAYS".to_string(),
                format!("must be an integer between 1 and {MAX_TOKEN_EXPIRY_DAYS}"),
            )
        })
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a URL environment variable with a default value.
fn get_url(key: &str, default: &str) -> Result<Url, ConfigError> {
    Url::parse(&get_env_or_default(key, default))
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_signing_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SIGNING_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SIGNING_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
