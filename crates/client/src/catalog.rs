//! Read-only product catalog queries.
//!
//! Product lookups and filter options are cached with `moka` for the
//! configured TTL. Stock checks bypass the cache: a stock pre-check must see
//! the server's last-known count, not a five minute old copy.

use moka::future::Cache;
use partstore_core::ProductId;
use tracing::{debug, instrument};

use crate::cache::{CacheKey, CacheValue};
use crate::config::CacheConfig;
use crate::error::ApiError;
use crate::http::{ApiClient, segment};
use crate::types::{FilterOptions, Page, Product, SearchFilters};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Client for catalog endpoints.
#[derive(Clone)]
pub struct CatalogClient {
    api: ApiClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogClient {
    #[must_use]
    pub fn new(api: ApiClient, cache_config: CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(cache_config.max_capacity)
            .time_to_live(cache_config.time_to_live)
            .build();
        Self { api, cache }
    }

    /// List products page by page.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, page: u32, limit: u32) -> Result<Page<Product>, ApiError> {
        let query = [
            ("page".to_string(), page.max(1).to_string()),
            ("limit".to_string(), limit.max(1).to_string()),
        ];
        let envelope = self.api.get::<Vec<Product>>("buyer/products", &query).await?;
        Ok(Page {
            items: envelope.data.unwrap_or_default(),
            pagination: envelope.pagination,
        })
    }

    /// Search products with the given filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, filters))]
    pub async fn search_products(&self, filters: &SearchFilters) -> Result<Vec<Product>, ApiError> {
        let query = filters.to_query();
        debug!(params = query.len(), "Searching catalog");
        let envelope = self
            .api
            .get::<Vec<Product>>("buyer/products/search", &query)
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Get a product, from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id.as_str().to_string());

        if let Some(CacheValue::Product(product)) = self.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        self.fetch_product_fresh(id).await
    }

    /// Fetch a product from the backend, refreshing the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn fetch_product_fresh(&self, id: &ProductId) -> Result<Product, ApiError> {
        if id.is_blank() {
            return Err(ApiError::Validation("Product ID is required".to_string()));
        }

        let path = format!("buyer/products/{}", segment(id.as_str()));
        let product = self
            .api
            .get::<Product>(&path, &[])
            .await?
            .data
            .ok_or_else(|| ApiError::NotFound(format!("Product not found: {id}")))?;

        self.cache
            .insert(
                CacheKey::Product(id.as_str().to_string()),
                CacheValue::Product(Box::new(product.clone())),
            )
            .await;

        Ok(product)
    }

    /// Filter metadata for the search form.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn filter_options(&self) -> Result<FilterOptions, ApiError> {
        if let Some(CacheValue::FilterOptions(options)) =
            self.cache.get(&CacheKey::FilterOptions).await
        {
            debug!("Cache hit for filter options");
            return Ok(*options);
        }

        let options = self
            .api
            .get::<FilterOptions>("buyer/product-filter-options", &[])
            .await?
            .data
            .unwrap_or_default();

        self.cache
            .insert(
                CacheKey::FilterOptions,
                CacheValue::FilterOptions(Box::new(options.clone())),
            )
            .await;

        Ok(options)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.cache
            .invalidate(&CacheKey::Product(id.as_str().to_string()))
            .await;
    }
}
