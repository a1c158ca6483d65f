//! HTTP transport for the storefront REST API.
//!
//! Uses `reqwest` for HTTP. Attaches the bearer credential when one is
//! present, unwraps the `{success, data, message, pagination}` envelope and
//! classifies failures into [`ApiError`]:
//!
//! | Condition | Error | Big |
//! |-----------|-------|-----|
//! | request could not be sent | `TransientNetwork` | yes |
//! | 400 without a message | `MalformedRequest` | yes |
//! | 400 with a message | `BadRequest` | no |
//! | 401 | `Unauthenticated` (credential cleared) | no |
//! | 404 | `NotFound` | no |
//! | 409 | `Conflict` | no |
//! | anything else | `Service` | yes |

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::credential::CredentialProvider;
use crate::error::ApiError;
use crate::types::Envelope;

const LOG_BODY_LIMIT: usize = 500;

/// Low-level client for the storefront backend.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    credentials: CredentialProvider,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("credentials", &self.inner.credentials)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Service` if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig, credentials: CredentialProvider) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ApiError::Service {
                status: 0,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_base_url.as_str().trim_end_matches('/').to_string(),
                credentials,
            }),
        })
    }

    /// The credential provider this client attaches tokens from.
    #[must_use]
    pub fn credentials(&self) -> &CredentialProvider {
        &self.inner.credentials
    }

    /// Absolute URL for an API path such as `buyer/cart`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the joined URL is malformed.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let joined = format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| ApiError::Validation(format!("invalid request URL: {e}")))
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Envelope<T>, ApiError> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let builder = self.request_url(Method::GET, url);
        self.execute(Method::GET, path, builder).await
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<Envelope<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path)?.json(body);
        self.execute(Method::POST, path, builder).await
    }

    pub(crate) async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Envelope<T>, ApiError> {
        let builder = self.request(Method::POST, path)?;
        self.execute(Method::POST, path, builder).await
    }

    pub(crate) async fn put<B, T>(&self, path: &str, body: &B) -> Result<Envelope<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path)?.json(body);
        self.execute(Method::PUT, path, builder).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Envelope<T>, ApiError> {
        let builder = self.request(Method::DELETE, path)?;
        self.execute(Method::DELETE, path, builder).await
    }

    /// Fetch a raw (non-JSON) body, e.g. an image.
    pub(crate) async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .request(Method::GET, path)?
            .send()
            .await
            .map_err(|e| self.transport_error(&Method::GET, path, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.status_error(&Method::GET, path, status, &body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&Method::GET, path, e))?;
        Ok(bytes.to_vec())
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.request_url(method, self.url(path)?))
    }

    fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .inner
            .client
            .request(method, url)
            .header("Content-Type", "application/json");
        if let Some(header) = self.inner.credentials.authorization_header() {
            builder = builder.header("Authorization", header);
        }
        builder
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(&method, path, e))?;

        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response
            .text()
            .await
            .map_err(|e| self.transport_error(&method, path, e))?;

        if !status.is_success() {
            return Err(self.status_error(&method, path, status, &response_text));
        }

        // Some mutations answer 204 or an empty 200
        if response_text.trim().is_empty() {
            return Ok(Envelope {
                success: Some(true),
                message: None,
                data: None,
                pagination: None,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                method = %method,
                path,
                error = %e,
                body = %truncate(&response_text),
                "Failed to parse storefront response"
            );
            ApiError::Decode(e.to_string())
        })?;

        if envelope.success == Some(false) {
            let message = envelope
                .message
                .clone()
                .unwrap_or_else(|| "Invalid request. Please check your input.".to_string());
            tracing::warn!(method = %method, path, reason = %message, "Backend reported failure");
            return Err(ApiError::BadRequest(message));
        }

        debug!(method = %method, path, status = status.as_u16(), "Storefront request succeeded");
        Ok(envelope)
    }

    fn transport_error(&self, method: &Method, path: &str, err: reqwest::Error) -> ApiError {
        tracing::error!(method = %method, path, error = %err, "Storefront request could not be sent");
        ApiError::TransientNetwork(err)
    }

    fn status_error(&self, method: &Method, path: &str, status: StatusCode, body: &str) -> ApiError {
        let err = classify(status, body);

        if matches!(err, ApiError::Unauthenticated(_)) {
            self.inner.credentials.clear();
        }

        if err.is_big_error() {
            tracing::error!(
                method = %method,
                path,
                status = %status,
                body = %truncate(body),
                "Storefront API returned non-success status"
            );
        } else {
            tracing::warn!(
                method = %method,
                path,
                status = %status,
                reason = %err,
                "Storefront API rejected request"
            );
        }

        err
    }
}

/// Map a non-success status and body onto the error taxonomy.
#[must_use]
pub fn classify(status: StatusCode, body: &str) -> ApiError {
    let message = extract_message(body);

    match status {
        StatusCode::BAD_REQUEST => message.map_or(ApiError::MalformedRequest, ApiError::BadRequest),
        StatusCode::UNAUTHORIZED => ApiError::Unauthenticated(
            message.unwrap_or_else(|| "Invalid credentials. Please try again.".to_string()),
        ),
        StatusCode::NOT_FOUND => {
            ApiError::NotFound(message.unwrap_or_else(|| "Resource not found.".to_string()))
        }
        StatusCode::CONFLICT => {
            ApiError::Conflict(message.unwrap_or_else(|| "Email already exists.".to_string()))
        }
        s if s.is_server_error() => ApiError::Service {
            status: s.as_u16(),
            message: "Internal server error. Please try again later.".to_string(),
        },
        s => ApiError::Service {
            status: s.as_u16(),
            message: message.unwrap_or_else(|| "An unexpected error occurred".to_string()),
        },
    }
}

fn extract_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}

/// Percent-encode a single path segment.
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_400_without_message_is_big() {
        let err = classify(StatusCode::BAD_REQUEST, "");
        assert!(matches!(err, ApiError::MalformedRequest));
        assert!(err.is_big_error());

        let err = classify(StatusCode::BAD_REQUEST, r#"{"message":"  "}"#);
        assert!(matches!(err, ApiError::MalformedRequest));
    }

    #[test]
    fn test_classify_400_with_message_is_inline() {
        let err = classify(StatusCode::BAD_REQUEST, r#"{"message":"Quantity exceeds stock"}"#);
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Quantity exceeds stock"));
        assert!(!err.is_big_error());
    }

    #[test]
    fn test_classify_fallback_messages() {
        assert_eq!(
            classify(StatusCode::UNAUTHORIZED, "").to_string(),
            "Invalid credentials. Please try again."
        );
        assert_eq!(classify(StatusCode::NOT_FOUND, "").to_string(), "Resource not found.");
        assert_eq!(classify(StatusCode::CONFLICT, "").to_string(), "Email already exists.");
    }

    #[test]
    fn test_classify_server_errors_are_big() {
        let err = classify(StatusCode::BAD_GATEWAY, r#"{"message":"upstream"}"#);
        assert!(matches!(err, ApiError::Service { status: 502, .. }));
        assert!(err.is_big_error());
        assert_eq!(err.to_string(), "Internal server error. Please try again later.");
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let config = ClientConfig::with_base_url("http://localhost:3000/api/").unwrap();
        let client = ApiClient::new(&config, CredentialProvider::new()).unwrap();
        assert_eq!(
            client.url("/buyer/cart").unwrap().as_str(),
            "http://localhost:3000/api/buyer/cart"
        );
        assert_eq!(
            client.url("buyer/products/p1").unwrap().as_str(),
            "http://localhost:3000/api/buyer/products/p1"
        );
    }

    #[test]
    fn test_segment_encodes_reserved_characters() {
        assert_eq!(segment("a/b c"), "a%2Fb%20c");
    }
}
