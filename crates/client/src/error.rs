//! Unified error handling with Sentry integration.
//!
//! Every operation in this crate returns [`ApiError`]. Each error carries the
//! same three facts a caller needs to react: a user-facing message, a numeric
//! code, and whether it is a "big" (systemic) error. [`ApiError::disposition`]
//! turns those into the two-way branch callers apply: inline alert or
//! full-page error, with authentication failures redirecting to login.

use partstore_core::{AddressError, EmailError, ProductId};
use serde::Serialize;
use thiserror::Error;

/// Where an error should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Show next to the control that triggered it; the user can correct and retry.
    Inline,
    /// Drop the credential and send the user to the login page.
    RedirectToLogin,
    /// Replace the page with an error screen; local recovery is not meaningful.
    FullPage,
}

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Protected operation attempted without a credential, or the backend
    /// answered 401.
    #[error("{0}")]
    Unauthenticated(String),

    /// Input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// Requested quantity exceeds the last-known stock.
    #[error("Only {available} items in stock")]
    InsufficientStock {
        product: ProductId,
        requested: u32,
        available: u32,
    },

    /// Backend reported a conflict (e.g. duplicate email on register).
    #[error("{0}")]
    Conflict(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Backend rejected the request with an explanation.
    #[error("{0}")]
    BadRequest(String),

    /// Backend rejected the request without saying why.
    #[error("Bad request. Something went wrong with the system.")]
    MalformedRequest,

    /// No connectivity or the request could not be sent.
    #[error("No internet connection. Please check your network.")]
    TransientNetwork(#[source] reqwest::Error),

    /// Backend failed (5xx or an unexpected status).
    #[error("{message}")]
    Service { status: u16, message: String },

    /// Backend answered with a body this client cannot read.
    #[error("Unexpected response from the server: {0}")]
    Decode(String),

    /// The payment gateway could not be loaded or started.
    #[error("Payment gateway unavailable: {0}")]
    PaymentGatewayUnavailable(String),

    /// The payment provider reported an error.
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// A checkout action was attempted from a state that does not allow it.
    #[error("Cannot {action} while checkout is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
}

/// The uniform `{message, code, isBigError}` shape every error can be
/// rendered as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorShape {
    pub message: String,
    pub code: u16,
    pub is_big_error: bool,
}

impl ApiError {
    /// HTTP-like code for the error; `0` means no connectivity.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Unauthenticated(_) => 401,
            Self::Validation(_)
            | Self::InsufficientStock { .. }
            | Self::BadRequest(_)
            | Self::MalformedRequest
            | Self::InvalidTransition { .. } => 400,
            Self::PaymentFailed(_) => 402,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::TransientNetwork(_) => 0,
            Self::Service { status, .. } => *status,
            Self::Decode(_) => 500,
            Self::PaymentGatewayUnavailable(_) => 503,
        }
    }

    /// Whether this is a systemic failure routed to a full-page error.
    #[must_use]
    pub const fn is_big_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedRequest
                | Self::TransientNetwork(_)
                | Self::Service { .. }
                | Self::Decode(_)
        )
    }

    /// How the caller should surface this error.
    #[must_use]
    pub const fn disposition(&self) -> Disposition {
        if matches!(self, Self::Unauthenticated(_)) {
            Disposition::RedirectToLogin
        } else if self.is_big_error() {
            Disposition::FullPage
        } else {
            Disposition::Inline
        }
    }

    /// Render as the uniform error shape.
    #[must_use]
    pub fn shape(&self) -> ErrorShape {
        ErrorShape {
            message: self.to_string(),
            code: self.code(),
            is_big_error: self.is_big_error(),
        }
    }

    /// Capture big errors to Sentry. Inline errors are user mistakes and are
    /// only logged.
    pub fn report(&self) {
        if self.is_big_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                code = self.code(),
                sentry_event_id = %event_id,
                "Storefront request failed"
            );
        } else {
            tracing::debug!(error = %self, code = self.code(), "Inline storefront error");
        }
    }
}

impl From<AddressError> for ApiError {
    fn from(err: AddressError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Add a breadcrumb for a storefront action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
