//! Cache types for catalog responses.

use crate::types::{FilterOptions, Product};

/// Cache key for catalog lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(String),
    FilterOptions,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    FilterOptions(Box<FilterOptions>),
}
