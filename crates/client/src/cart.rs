//! Server-side cart operations.
//!
//! The server owns the cart: every mutation is followed by a re-fetch and the
//! returned [`Cart`] is always the server's view, never a locally patched
//! copy. Adds and updates are checked against the product's last-known stock
//! first so the user gets fast feedback; the backend still enforces stock on
//! its side.

use partstore_core::ProductId;
use tracing::{debug, instrument};

use crate::catalog::CatalogClient;
use crate::credential::CredentialProvider;
use crate::error::{ApiError, add_breadcrumb};
use crate::http::{ApiClient, segment};
use crate::types::{Cart, CartMutation};

/// Cart endpoints under `buyer/cart`.
#[derive(Clone)]
pub struct CartService {
    api: ApiClient,
    catalog: CatalogClient,
}

impl CartService {
    #[must_use]
    pub const fn new(api: ApiClient, catalog: CatalogClient) -> Self {
        Self { api, catalog }
    }

    /// The credential provider cart requests are made with.
    #[must_use]
    pub fn credentials(&self) -> &CredentialProvider {
        self.api.credentials()
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Fetch the current cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` when signed out, or an error if
    /// the API request fails.
    #[instrument(skip(self))]
    pub async fn view_cart(&self) -> Result<Cart, ApiError> {
        self.api.credentials().require("view the cart")?;

        let cart = self
            .api
            .get::<Cart>("buyer/cart", &[])
            .await?
            .data
            .unwrap_or_default();

        debug!(items = cart.items.len(), total = %cart.total, "Fetched cart");
        Ok(cart)
    }

    /// Add `quantity` units of `product` to the cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` when signed out,
    /// `ApiError::Validation` when `quantity` is zero,
    /// `ApiError::InsufficientStock` when `quantity` exceeds the product's
    /// stock (no mutation is sent), or an error if an API request fails.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn add_to_cart(&self, product: &ProductId, quantity: u32) -> Result<Cart, ApiError> {
        self.api.credentials().require("add to cart")?;
        self.check_stock(product, quantity).await?;

        let body = CartMutation {
            product_id: product,
            quantity,
        };
        self.api
            .post::<_, serde_json::Value>("buyer/cart/add", &body)
            .await?;

        add_breadcrumb(
            "cart",
            "Added to cart",
            &[("product_id", product.as_str()), ("quantity", &quantity.to_string())],
        );
        self.resync(product).await
    }

    /// Set the quantity of a line already in the cart.
    ///
    /// # Errors
    ///
    /// Same as [`CartService::add_to_cart`].
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn update_cart_item(
        &self,
        product: &ProductId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        self.api.credentials().require("update the cart")?;
        self.check_stock(product, quantity).await?;

        let body = CartMutation {
            product_id: product,
            quantity,
        };
        self.api
            .put::<_, serde_json::Value>("buyer/cart/update", &body)
            .await?;

        add_breadcrumb(
            "cart",
            "Updated cart line",
            &[("product_id", product.as_str()), ("quantity", &quantity.to_string())],
        );
        self.resync(product).await
    }

    /// Remove a line from the cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` when signed out, or an error if
    /// an API request fails.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn remove_from_cart(&self, product: &ProductId) -> Result<Cart, ApiError> {
        self.api.credentials().require("remove from cart")?;
        if product.is_blank() {
            return Err(ApiError::Validation("Product ID is required".to_string()));
        }

        let path = format!("buyer/cart/remove/{}", segment(product.as_str()));
        self.api.delete::<serde_json::Value>(&path).await?;

        add_breadcrumb("cart", "Removed from cart", &[("product_id", product.as_str())]);
        self.resync(product).await
    }

    /// Empty the cart. Clearing an empty cart succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` when signed out, or an error if
    /// an API request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<Cart, ApiError> {
        self.api.credentials().require("clear the cart")?;

        self.api.delete::<serde_json::Value>("buyer/cart/clear").await?;

        add_breadcrumb("cart", "Cleared cart", &[]);
        self.view_cart().await
    }

    async fn check_stock(&self, product: &ProductId, quantity: u32) -> Result<(), ApiError> {
        if quantity < 1 {
            return Err(ApiError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let available = self.catalog.fetch_product_fresh(product).await?.stock;
        if quantity > available {
            debug!(requested = quantity, available, "Rejected cart change over stock");
            return Err(ApiError::InsufficientStock {
                product: product.clone(),
                requested: quantity,
                available,
            });
        }

        Ok(())
    }

    async fn resync(&self, product: &ProductId) -> Result<Cart, ApiError> {
        self.catalog.invalidate_product(product).await;
        self.view_cart().await
    }
}
