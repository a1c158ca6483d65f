//! CLI error type.

use partstore_client::{ApiError, ConfigError, Disposition};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A storefront operation failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Local file access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON could not be written or read.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Command-line input was malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CliError {
    /// How the error should be shown. Only API errors can redirect to login
    /// or be systemic; everything else is the user's to fix.
    #[must_use]
    pub const fn disposition(&self) -> Disposition {
        match self {
            Self::Api(err) => err.disposition(),
            Self::Config(_) | Self::Io(_) | Self::Json(_) => Disposition::FullPage,
            Self::InvalidInput(_) => Disposition::Inline,
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self.disposition() {
            Disposition::Inline => 1,
            Disposition::RedirectToLogin => 2,
            Disposition::FullPage => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_disposition() {
        assert_eq!(CliError::InvalidInput("x".into()).exit_code(), 1);
        assert_eq!(
            CliError::Api(ApiError::Unauthenticated("login".into())).exit_code(),
            2
        );
        assert_eq!(CliError::Api(ApiError::MalformedRequest).exit_code(), 3);
        assert_eq!(
            CliError::Api(ApiError::Validation("please fill all required fields".into()))
                .exit_code(),
            1
        );
    }
}
