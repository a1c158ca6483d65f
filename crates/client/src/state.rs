//! Shared client state.

use std::sync::Arc;

use crate::account::AccountService;
use crate::auth::AuthService;
use crate::cart::CartService;
use crate::catalog::CatalogClient;
use crate::checkout::Checkout;
use crate::config::ClientConfig;
use crate::credential::CredentialProvider;
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::orders::OrderService;
use crate::payment::{PaymentBridge, PaymentProvider};

/// Every storefront service, sharing one HTTP client, one credential and
/// one catalog cache.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: ClientConfig,
    api: ApiClient,
    catalog: CatalogClient,
    payment: PaymentBridge,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("api", &self.inner.api)
            .field("payment", &self.inner.payment)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Build the services from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        credentials: CredentialProvider,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config, credentials)?;
        let catalog = CatalogClient::new(api.clone(), config.catalog_cache);
        let payment = PaymentBridge::new(payment_provider, config.payment.sandbox);

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                api,
                catalog,
                payment,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialProvider {
        self.inner.api.credentials()
    }

    #[must_use]
    pub fn auth(&self) -> AuthService {
        AuthService::new(self.inner.api.clone())
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> CartService {
        CartService::new(self.inner.api.clone(), self.inner.catalog.clone())
    }

    #[must_use]
    pub fn orders(&self) -> OrderService {
        OrderService::new(self.inner.api.clone())
    }

    #[must_use]
    pub fn account(&self) -> AccountService {
        AccountService::new(self.inner.api.clone())
    }

    #[must_use]
    pub fn payment(&self) -> &PaymentBridge {
        &self.inner.payment
    }

    /// A fresh checkout. Checkouts share the payment bridge, so the provider
    /// is loaded once no matter how many are started.
    #[must_use]
    pub fn checkout(&self) -> Checkout {
        Checkout::new(self.cart(), self.orders(), self.inner.payment.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::checkout::CheckoutState;
    use crate::payment::testing::ScriptedPaymentProvider;

    #[test]
    fn test_services_share_credentials() {
        let config = ClientConfig::with_base_url("http://localhost:3000/api").unwrap();
        let storefront = Storefront::new(
            config,
            CredentialProvider::new(),
            Arc::new(ScriptedPaymentProvider::new([])),
        )
        .unwrap();

        storefront.auth().logout();
        assert!(!storefront.credentials().is_authenticated());
        assert!(matches!(storefront.checkout().state(), CheckoutState::Idle));
        assert!(!storefront.payment().is_loaded());
    }
}
