//! End-to-end tests for partstore.
//!
//! Each test runs the real client stack against a `mockito` server standing
//! in for the storefront backend, with a scripted payment provider in place
//! of the hosted payment window.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p partstore-integration-tests
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use mockito::{Mock, ServerGuard};
use partstore_client::payment::testing::{Script, ScriptedPaymentProvider};
use partstore_client::{
    ClientConfig, CredentialProvider, CredentialStore, Storefront, StoredCredential, UserRef,
};
use partstore_core::{ShippingAddress, UserId};

/// A mocked backend and a storefront pointed at it.
pub struct TestContext {
    pub server: ServerGuard,
    pub storefront: Storefront,
    pub payments: Arc<ScriptedPaymentProvider>,
    pub store: Arc<MemoryCredentialStore>,
}

impl TestContext {
    /// Start a mock backend. Payment sessions follow `script` in order.
    pub async fn new(script: impl IntoIterator<Item = Script>) -> Self {
        Self::with_provider(ScriptedPaymentProvider::new(script)).await
    }

    /// Start a mock backend with a prepared payment provider.
    ///
    /// # Panics
    ///
    /// Panics if the storefront cannot be built against the mock server.
    pub async fn with_provider(provider: ScriptedPaymentProvider) -> Self {
        let server = mockito::Server::new_async().await;
        let config = ClientConfig::with_base_url(&server.url())
            .unwrap_or_else(|e| panic!("mock server URL rejected: {e}"));

        let store = Arc::new(MemoryCredentialStore::default());
        let credentials = CredentialProvider::with_store(store.clone());
        let payments = Arc::new(provider);
        let storefront = Storefront::new(config, credentials, payments.clone())
            .unwrap_or_else(|e| panic!("storefront could not be built: {e}"));

        Self {
            server,
            storefront,
            payments,
            store,
        }
    }

    /// Sign in without going through the login endpoint.
    pub fn sign_in(&self) {
        self.storefront.credentials().set_credential(
            "test-token",
            UserRef {
                user_id: UserId::new("buyer-1"),
                role: None,
                status: None,
            },
        );
    }

    /// Serve a product with the given stock and price.
    pub async fn product(&mut self, id: &str, stock: u32, price: u32) -> Mock {
        self.server
            .mock("GET", format!("/buyer/products/{id}").as_str())
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "success": true,
                    "data": {"_id": id, "title": format!("Part {id}"), "price": price, "stock": stock}
                })
                .to_string(),
            )
            .create_async()
            .await
    }

    /// Serve `GET /buyer/cart` with the given `(product, quantity, unit price)` lines.
    pub async fn cart(&mut self, lines: &[(&str, u32, u32)]) -> Mock {
        let items: Vec<_> = lines
            .iter()
            .map(|(id, quantity, price)| {
                serde_json::json!({"productId": id, "quantity": quantity, "price": price})
            })
            .collect();
        let total: u32 = lines.iter().map(|(_, q, p)| q * p).sum();

        self.server
            .mock("GET", "/buyer/cart")
            .with_status(200)
            .with_body(
                serde_json::json!({"success": true, "data": {"items": items, "total": total}})
                    .to_string(),
            )
            .create_async()
            .await
    }
}

/// A complete shipping address.
#[must_use]
pub fn address() -> ShippingAddress {
    ShippingAddress {
        street: "12 Galle Road".to_string(),
        city: "Colombo".to_string(),
        district: Some("Colombo".to_string()),
        postal_code: "00300".to_string(),
        country: "Sri Lanka".to_string(),
    }
}

/// Credential store that keeps the credential in memory.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    saved: Mutex<Option<StoredCredential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn saved(&self) -> Option<StoredCredential> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> std::io::Result<Option<StoredCredential>> {
        Ok(self.saved())
    }

    fn save(&self, credential: &StoredCredential) -> std::io::Result<()> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
