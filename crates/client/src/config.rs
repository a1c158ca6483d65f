//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `PARTSTORE_API_BASE_URL` - Backend REST base URL (default: `http://localhost:3000/api`)
//! - `PARTSTORE_PAYMENT_SCRIPT_URL` - Payment gateway script (default: `https://www.payhere.lk/lib/payhere.js`)
//! - `PARTSTORE_PAYMENT_SANDBOX` - Stamp payments as sandbox (default: true)
//! - `PARTSTORE_CATALOG_CACHE_TTL_SECS` - Product cache TTL (default: 300)
//! - `PARTSTORE_CATALOG_CACHE_CAPACITY` - Product cache capacity (default: 1000)
//! - `PARTSTORE_HTTP_USER_AGENT` - User agent sent with every request
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_PAYMENT_SCRIPT_URL: &str = "https://www.payhere.lk/lib/payhere.js";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CACHE_CAPACITY: u64 = 1000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend REST API base URL (path prefix included, e.g. `/api`)
    pub api_base_url: Url,
    /// User agent sent with every request
    pub user_agent: String,
    /// Payment gateway configuration
    pub payment: PaymentConfig,
    /// Catalog cache configuration
    pub catalog_cache: CacheConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Payment gateway configuration.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Location of the gateway's client script
    pub script_url: Url,
    /// Whether payments are started in sandbox mode
    pub sandbox: bool,
}

/// Catalog cache sizing.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub time_to_live: Duration,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            time_to_live: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            max_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_url(
            "PARTSTORE_API_BASE_URL",
            &get_env_or_default("PARTSTORE_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let user_agent = get_env_or_default(
            "PARTSTORE_HTTP_USER_AGENT",
            concat!("partstore-client/", env!("CARGO_PKG_VERSION")),
        );

        Ok(Self {
            api_base_url,
            user_agent,
            payment: PaymentConfig::from_env()?,
            catalog_cache: CacheConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Configuration pointing at `base_url` with every other setting defaulted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `base_url` is not a valid absolute URL.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: parse_url("api_base_url", base_url)?,
            ..Self::default()
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_BASE_URL)
                .unwrap_or_else(|_| unreachable!("default base URL is valid")),
            user_agent: concat!("partstore-client/", env!("CARGO_PKG_VERSION")).to_string(),
            payment: PaymentConfig::default(),
            catalog_cache: CacheConfig::default(),
            sentry_dsn: None,
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            script_url: Url::parse(DEFAULT_PAYMENT_SCRIPT_URL)
                .unwrap_or_else(|_| unreachable!("default script URL is valid")),
            sandbox: true,
        }
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            script_url: parse_url(
                "PARTSTORE_PAYMENT_SCRIPT_URL",
                &get_env_or_default("PARTSTORE_PAYMENT_SCRIPT_URL", DEFAULT_PAYMENT_SCRIPT_URL),
            )?,
            sandbox: parse_bool(
                "PARTSTORE_PAYMENT_SANDBOX",
                &get_env_or_default("PARTSTORE_PAYMENT_SANDBOX", "true"),
            )?,
        })
    }
}

impl CacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let ttl = parse_u64(
            "PARTSTORE_CATALOG_CACHE_TTL_SECS",
            &get_env_or_default(
                "PARTSTORE_CATALOG_CACHE_TTL_SECS",
                &DEFAULT_CACHE_TTL_SECS.to_string(),
            ),
        )?;
        let capacity = parse_u64(
            "PARTSTORE_CATALOG_CACHE_CAPACITY",
            &get_env_or_default(
                "PARTSTORE_CATALOG_CACHE_CAPACITY",
                &DEFAULT_CACHE_CAPACITY.to_string(),
            ),
        )?;
        Ok(Self {
            time_to_live: Duration::from_secs(ttl),
            max_capacity: capacity,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url.as_str(), "http://localhost:3000/api");
        assert!(config.payment.sandbox);
        assert_eq!(config.catalog_cache.time_to_live, Duration::from_secs(300));
    }

    #[test]
    fn test_with_base_url_rejects_relative() {
        assert!(ClientConfig::with_base_url("/api").is_err());
        assert!(ClientConfig::with_base_url("mailto:someone@example.com").is_err());
        let config = ClientConfig::with_base_url("http://127.0.0.1:1234").unwrap();
        assert_eq!(config.api_base_url.port(), Some(1234));
    }

    #[test]
    fn test_parse_bool_variants() {
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        let err = parse_bool("X", "maybe").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_parse_u64_rejects_garbage() {
        assert_eq!(parse_u64("X", " 60 ").unwrap(), 60);
        assert!(parse_u64("X", "sixty").is_err());
    }
}
