//! Login, registration and logout.

use partstore_core::Email;
use tracing::{info, instrument};

use crate::credential::{CredentialProvider, UserRef};
use crate::error::{ApiError, add_breadcrumb};
use crate::http::ApiClient;
use crate::types::{AuthResponse, LoginRequest, RegisterRequest};

/// Authentication endpoints. A successful call stores the returned token in
/// the shared [`CredentialProvider`].
#[derive(Debug, Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn credentials(&self) -> &CredentialProvider {
        self.api.credentials()
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a malformed email or empty password
    /// (no request is sent), `ApiError::Unauthenticated` for wrong
    /// credentials, or another error if the request fails.
    #[instrument(skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserRef, ApiError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(ApiError::Validation("Password is required".to_string()));
        }

        let request = LoginRequest {
            email: email.as_str(),
            password,
        };
        let response = self
            .api
            .post::<_, AuthResponse>("auth/login", &request)
            .await?
            .data
            .ok_or_else(|| ApiError::Decode("login response carried no data".to_string()))?;

        Ok(self.store(response))
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for missing fields, `ApiError::Conflict`
    /// when the email is already registered, or another error if the request
    /// fails.
    #[instrument(skip(self, request), fields(role = %request.role))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserRef, ApiError> {
        if request.password.is_empty() {
            return Err(ApiError::Validation("Password is required".to_string()));
        }
        if request.name.trim().is_empty() {
            return Err(ApiError::Validation("Name is required".to_string()));
        }

        let response = self
            .api
            .post::<_, AuthResponse>("auth/register", request)
            .await?
            .data
            .ok_or_else(|| ApiError::Decode("register response carried no data".to_string()))?;

        Ok(self.store(response))
    }

    /// Drop the credential. No request is sent.
    pub fn logout(&self) {
        self.credentials().clear();
        add_breadcrumb("auth", "Logged out", &[]);
    }

    fn store(&self, response: AuthResponse) -> UserRef {
        let user = UserRef {
            user_id: response.user_id,
            role: response.role,
            status: response.status,
        };
        self.credentials().set_credential(response.token, user.clone());
        add_breadcrumb("auth", "Logged in", &[("user_id", user.user_id.as_str())]);
        info!(user_id = %user.user_id, "Signed in");
        user
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mockito::{Matcher, Server};
    use partstore_core::Role;

    use super::*;
    use crate::config::ClientConfig;

    fn auth(server: &Server) -> AuthService {
        let config = ClientConfig::with_base_url(&server.url()).unwrap();
        AuthService::new(ApiClient::new(&config, CredentialProvider::new()).unwrap())
    }

    #[tokio::test]
    async fn test_login_stores_credential() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/login")
            .match_body(Matcher::Json(serde_json::json!({
                "email": "buyer@example.com",
                "password": "hunter2"
            })))
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"userId":"u1","token":"tok","role":"buyer"}}"#)
            .create_async()
            .await;

        let auth = auth(&server);
        let user = auth.login(" buyer@example.com ", "hunter2").await.unwrap();

        mock.assert_async().await;
        assert_eq!(user.user_id.as_str(), "u1");
        assert_eq!(user.role, Some(Role::Buyer));
        assert!(auth.credentials().is_authenticated());

        auth.logout();
        assert!(!auth.credentials().is_authenticated());
    }

    #[tokio::test]
    async fn test_login_rejects_bad_email_without_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/login")
            .expect(0)
            .create_async()
            .await;

        let err = auth(&server).login("not-an-email", "pw").await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthenticated() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/login")
            .with_status(401)
            .with_body("{}")
            .create_async()
            .await;

        let err = auth(&server)
            .login("buyer@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials. Please try again.");
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_conflict() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/register")
            .with_status(409)
            .with_body(r#"{"message":"Email already exists."}"#)
            .create_async()
            .await;

        let request = RegisterRequest {
            email: Email::parse("buyer@example.com").unwrap(),
            password: "pw".to_string(),
            role: Role::Buyer,
            name: "Nimal".to_string(),
            phone: "0771234567".to_string(),
        };
        let err = auth(&server).register(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert!(!err.is_big_error());
    }
}
