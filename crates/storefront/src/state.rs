//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::{Catalog, CatalogError};
use crate::config::StorefrontConfig;
use crate::db::{
    CartStore, MemoryCartStore, MemoryOrderStore, MemoryPendingCheckoutStore, MemoryUserStore,
    OrderStore, PendingCheckoutStore, UserStore,
};
use crate::services::{AuthService, CartService, CheckoutService, TokenIssuer};
use crate::stripe::{PaymentProvider, StripeClient, StripeError, WebhookVerifier};

/// Error building application state at startup.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("stripe client error: {0}")]
    Stripe(#[from] StripeError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the catalog, the stores and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Catalog,
    users: Arc<dyn UserStore>,
    carts: Arc<dyn CartStore>,
    pending_checkouts: Arc<dyn PendingCheckoutStore>,
    orders: Arc<dyn OrderStore>,
    tokens: TokenIssuer,
    payments: Option<Arc<dyn PaymentProvider>>,
    webhooks: Option<WebhookVerifier>,
}

impl AppState {
    /// Create application state with in-memory stores.
    ///
    /// Loads the catalog and, when Stripe is configured, builds the Stripe
    /// client and webhook verifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded or the Stripe client
    /// cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let catalog = Catalog::load(config.catalog_path.as_deref())?;

        let payments = match &config.stripe {
            Some(stripe) => Some(Arc::new(StripeClient::new(stripe)?) as Arc<dyn PaymentProvider>),
            None => {
                tracing::warn!("STRIPE_SECRET_KEY not set, checkout is disabled");
                None
            }
        };

        Ok(Self::builder(config, catalog).payments(payments).build())
    }

    /// Start assembling state by hand, for tests and tools.
    ///
    /// Stores default to in-memory and no payment provider is set. The
    /// webhook verifier follows `config.stripe`.
    #[must_use]
    pub fn builder(config: StorefrontConfig, catalog: Catalog) -> AppStateBuilder {
        AppStateBuilder {
            config,
            catalog,
            payments: None,
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the bearer token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Get a reference to the order store.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    /// Whether a payment provider is configured.
    #[must_use]
    pub fn payments_enabled(&self) -> bool {
        self.inner.payments.is_some()
    }

    /// Authentication service over this state's stores.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.inner.users.as_ref(), &self.inner.tokens)
    }

    /// Cart service over this state's stores.
    #[must_use]
    pub fn carts(&self) -> CartService<'_> {
        CartService::new(self.inner.carts.as_ref(), &self.inner.catalog)
    }

    /// Checkout service over this state's stores and payment provider.
    #[must_use]
    pub fn checkout(&self) -> CheckoutService<'_> {
        let inner = &self.inner;
        CheckoutService::new(
            &inner.catalog,
            inner.carts.as_ref(),
            inner.pending_checkouts.as_ref(),
            inner.orders.as_ref(),
            &inner.config.frontend_url,
        )
        .with_provider(inner.payments.as_deref())
        .with_webhook_verifier(inner.webhooks.as_ref())
    }
}

/// Builder for [`AppState`].
pub struct AppStateBuilder {
    config: StorefrontConfig,
    catalog: Catalog,
    payments: Option<Arc<dyn PaymentProvider>>,
}

impl AppStateBuilder {
    /// Set the payment provider.
    #[must_use]
    pub fn payments(mut self, payments: Option<Arc<dyn PaymentProvider>>) -> Self {
        self.payments = payments;
        self
    }

    #[must_use]
    pub fn build(self) -> AppState {
        let tokens = TokenIssuer::new(&self.config.jwt);
        let webhooks = self
            .config
            .stripe
            .as_ref()
            .and_then(|stripe| stripe.webhook_secret.clone())
            .map(WebhookVerifier::new);

        AppState {
            inner: Arc::new(AppStateInner {
                config: self.config,
                catalog: self.catalog,
                users: Arc::new(MemoryUserStore::new()),
                carts: Arc::new(MemoryCartStore::new()),
                pending_checkouts: Arc::new(MemoryPendingCheckoutStore::new()),
                orders: Arc::new(MemoryOrderStore::new()),
                tokens,
                payments: self.payments,
                webhooks,
            }),
        }
    }
}
