//! Complaints, profile and uploaded images.

use partstore_core::{ImageId, OrderId};
use tracing::instrument;

use crate::error::{ApiError, add_breadcrumb};
use crate::http::{ApiClient, segment};
use crate::types::{Complaint, Profile};

#[derive(Debug, Clone)]
pub struct AccountService {
    api: ApiClient,
}

impl AccountService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// File a complaint about a delivered order line.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` when the product or description is
    /// missing (no request is sent), or an error if the API request fails.
    #[instrument(skip(self, complaint), fields(order_id = %order, product_id = %complaint.product_id))]
    pub async fn make_complaint(&self, order: &OrderId, complaint: &Complaint) -> Result<(), ApiError> {
        self.api.credentials().require("make complaint")?;
        if complaint.product_id.is_blank() {
            return Err(ApiError::Validation("Product ID is required".to_string()));
        }
        if complaint.description.trim().is_empty() {
            return Err(ApiError::Validation("Description is required".to_string()));
        }

        let path = format!("buyer/order/{}/complaint", segment(order.as_str()));
        self.api.post::<_, serde_json::Value>(&path, complaint).await?;

        add_breadcrumb(
            "order",
            "Complaint filed",
            &[
                ("order_id", order.as_str()),
                ("refund_requested", if complaint.refund_requested { "true" } else { "false" }),
            ],
        );
        Ok(())
    }

    /// The signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` when signed out, or an error if
    /// the API request fails.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<Profile, ApiError> {
        self.api.credentials().require("view profile")?;

        self.api
            .get::<Profile>("profile", &[])
            .await?
            .data
            .ok_or_else(|| ApiError::Decode("profile response carried no data".to_string()))
    }

    /// Raw bytes of an uploaded image.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown image, or an error if the
    /// API request fails.
    #[instrument(skip(self), fields(image_id = %id))]
    pub async fn image(&self, id: &ImageId) -> Result<Vec<u8>, ApiError> {
        if id.is_blank() {
            return Err(ApiError::Validation("Image ID is required".to_string()));
        }
        let path = format!("uploads/{}", segment(id.as_str()));
        self.api.get_bytes(&path).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mockito::{Matcher, Server};
    use partstore_core::{Price, ProductId, UserId};

    use super::*;
    use crate::config::ClientConfig;
    use crate::credential::{CredentialProvider, UserRef};

    fn account(server: &Server, signed_in: bool) -> AccountService {
        let credentials = CredentialProvider::new();
        if signed_in {
            credentials.set_credential(
                "tok",
                UserRef {
                    user_id: UserId::new("u1"),
                    role: None,
                    status: None,
                },
            );
        }
        let config = ClientConfig::with_base_url(&server.url()).unwrap();
        AccountService::new(ApiClient::new(&config, credentials).unwrap())
    }

    fn complaint(description: &str) -> Complaint {
        Complaint {
            product_id: ProductId::new("p1"),
            description: description.to_string(),
            refund_requested: true,
            refund_amount: Some(Price::from_cents(4000)),
        }
    }

    #[tokio::test]
    async fn test_complaint_posts_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/buyer/order/o1/complaint")
            .match_body(Matcher::Json(serde_json::json!({
                "productId": "p1",
                "description": "Arrived cracked",
                "refundRequested": true,
                "refundAmount": 40.0
            })))
            .with_status(201)
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        account(&server, true)
            .make_complaint(&OrderId::new("o1"), &complaint("Arrived cracked"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complaint_requires_description() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = account(&server, true)
            .make_complaint(&OrderId::new("o1"), &complaint("   "))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.to_string(), "Description is required");
    }

    #[tokio::test]
    async fn test_profile_requires_login() {
        let server = Server::new_async().await;
        let err = account(&server, false).profile().await.unwrap_err();
        assert_eq!(err.to_string(), "User must be logged in to view profile");
    }

    #[tokio::test]
    async fn test_image_returns_bytes() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/uploads/img1")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body([0x89, b'P', b'N', b'G'])
            .create_async()
            .await;

        let bytes = account(&server, false)
            .image(&ImageId::new("img1"))
            .await
            .unwrap();
        assert_eq!(bytes, [0x89, b'P', b'N', b'G']);
    }
}
