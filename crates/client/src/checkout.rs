//! Checkout state machine.
//!
//! ```text
//! Idle ──begin──▶ AddressCollection ──submit_address──▶ Reviewing
//!   ▲                  │                                  │   ▲
//!   └──────cancel──────┴──────────────cancel──────────────┘   │
//!                                                             │ retry_payment
//! Reviewing ──place_order──▶ Submitting ──▶ AwaitingPayment ──┼──▶ Completed
//!                               │                             ├──▶ Dismissed
//!                               └──▶ Failed (no order)        └──▶ Failed (order kept)
//! ```
//!
//! `AwaitingPayment` can only be entered from `Submitting`, so a checkout
//! never has two payment sessions in flight. A dismissed or failed payment
//! keeps the created order: `retry_payment` goes back to review and the next
//! `place_order` pays for the same order instead of creating another.
//!
//! Dropping a `place_order` future abandons the session. Call
//! [`Checkout::reset`] afterwards; a provider callback that fires later is
//! ignored.

use std::fmt;

use partstore_core::{OrderId, ProductId, ShippingAddress};
use tracing::{info, instrument, warn};

use crate::cart::CartService;
use crate::error::{ApiError, add_breadcrumb};
use crate::orders::OrderService;
use crate::payment::{PaymentBridge, PaymentOutcome};
use crate::types::{CreatedOrder, OrderItemRequest, OrderRequest};

/// What is being bought.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutSource {
    /// Everything in the server-side cart.
    Cart,
    /// A single product bought directly from its page.
    Direct { product: ProductId, quantity: u32 },
}

/// Where a checkout currently is.
#[derive(Debug, Clone, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    AddressCollection {
        source: CheckoutSource,
    },
    Reviewing {
        source: CheckoutSource,
        address: ShippingAddress,
        order: Option<CreatedOrder>,
    },
    Submitting {
        source: CheckoutSource,
        address: ShippingAddress,
    },
    AwaitingPayment {
        source: CheckoutSource,
        address: ShippingAddress,
        order: CreatedOrder,
    },
    Completed {
        order_id: OrderId,
        reference: String,
    },
    Dismissed {
        source: CheckoutSource,
        address: ShippingAddress,
        order: CreatedOrder,
    },
    Failed {
        message: String,
        source: CheckoutSource,
        address: ShippingAddress,
        order: Option<CreatedOrder>,
    },
}

impl CheckoutState {
    /// Short state name used in logs and transition errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AddressCollection { .. } => "collecting an address",
            Self::Reviewing { .. } => "reviewing",
            Self::Submitting { .. } => "submitting",
            Self::AwaitingPayment { .. } => "awaiting payment",
            Self::Completed { .. } => "completed",
            Self::Dismissed { .. } => "dismissed",
            Self::Failed { .. } => "failed",
        }
    }

    /// Whether the checkout has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Dismissed { .. } | Self::Failed { .. }
        )
    }

    /// The created order, once there is one.
    #[must_use]
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::Reviewing { order, .. } | Self::Failed { order, .. } => {
                order.as_ref().map(|o| &o.order_id)
            }
            Self::AwaitingPayment { order, .. } | Self::Dismissed { order, .. } => {
                Some(&order.order_id)
            }
            Self::Completed { order_id, .. } => Some(order_id),
            _ => None,
        }
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a `place_order` call that reached the payment provider.
#[derive(Debug)]
pub struct CheckoutReport {
    pub order_id: OrderId,
    pub outcome: PaymentOutcome,
    /// Set when the payment completed but emptying the cart afterwards
    /// failed. The order stands; the cart still shows the bought items.
    pub cart_clear_error: Option<ApiError>,
}

/// Drives one buyer through address entry, order creation and payment.
pub struct Checkout {
    cart: CartService,
    orders: OrderService,
    payment: PaymentBridge,
    state: CheckoutState,
}

impl fmt::Debug for Checkout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checkout")
            .field("state", &self.state)
            .field("payment", &self.payment)
            .finish_non_exhaustive()
    }
}

impl Checkout {
    #[must_use]
    pub const fn new(cart: CartService, orders: OrderService, payment: PaymentBridge) -> Self {
        Self {
            cart,
            orders,
            payment,
            state: CheckoutState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Start collecting a shipping address for `source`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidTransition` while a checkout is in progress,
    /// `ApiError::Unauthenticated` when signed out, or
    /// `ApiError::Validation` for a direct purchase of zero items.
    pub fn begin(&mut self, source: CheckoutSource) -> Result<(), ApiError> {
        if !matches!(self.state, CheckoutState::Idle) && !self.state.is_terminal() {
            return Err(self.invalid("begin checkout"));
        }
        self.cart.credentials().require("check out")?;
        if let CheckoutSource::Direct { product, quantity } = &source {
            if product.is_blank() {
                return Err(ApiError::Validation("Product ID is required".to_string()));
            }
            if *quantity < 1 {
                return Err(ApiError::Validation(
                    "Quantity must be at least 1".to_string(),
                ));
            }
        }

        add_breadcrumb("checkout", "Checkout started", &[]);
        self.state = CheckoutState::AddressCollection { source };
        Ok(())
    }

    /// Validate and accept the shipping address.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` naming every missing field (the state
    /// stays at address collection), or `ApiError::InvalidTransition`
    /// outside address collection.
    pub fn submit_address(&mut self, address: &ShippingAddress) -> Result<(), ApiError> {
        let CheckoutState::AddressCollection { source } = &self.state else {
            return Err(self.invalid("submit an address"));
        };
        address.validate()?;

        self.state = CheckoutState::Reviewing {
            source: source.clone(),
            address: address.normalized(),
            order: None,
        };
        Ok(())
    }

    /// Abandon the checkout before anything was submitted.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidTransition` outside address collection and
    /// review.
    pub fn cancel(&mut self) -> Result<(), ApiError> {
        match self.state {
            CheckoutState::AddressCollection { .. } | CheckoutState::Reviewing { .. } => {
                self.state = CheckoutState::Idle;
                Ok(())
            }
            _ => Err(self.invalid("cancel")),
        }
    }

    /// Return to review after a dismissed or failed payment, keeping the
    /// created order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidTransition` unless the payment was
    /// dismissed or failed after the order was created.
    pub fn retry_payment(&mut self) -> Result<(), ApiError> {
        let next = match &self.state {
            CheckoutState::Dismissed {
                source,
                address,
                order,
            }
            | CheckoutState::Failed {
                source,
                address,
                order: Some(order),
                ..
            } => CheckoutState::Reviewing {
                source: source.clone(),
                address: address.clone(),
                order: Some(order.clone()),
            },
            _ => return Err(self.invalid("retry payment")),
        };

        add_breadcrumb("checkout", "Payment retry", &[]);
        self.state = next;
        Ok(())
    }

    /// Drop whatever is in progress and go back to idle.
    pub fn reset(&mut self) {
        if matches!(
            self.state,
            CheckoutState::Submitting { .. } | CheckoutState::AwaitingPayment { .. }
        ) {
            warn!(state = self.state.name(), "Abandoning in-flight checkout");
        }
        self.state = CheckoutState::Idle;
    }

    /// Create the order (unless retrying one) and pay for it.
    ///
    /// On success the state is `Completed` or `Dismissed`, reported in
    /// [`CheckoutReport::outcome`]. A completed cart checkout also empties
    /// the cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidTransition` outside review. Order creation
    /// and payment failures are returned as-is and leave the state `Failed`.
    #[instrument(skip(self), fields(state = self.state.name()))]
    pub async fn place_order(&mut self) -> Result<CheckoutReport, ApiError> {
        let (source, address, order) = match std::mem::take(&mut self.state) {
            CheckoutState::Reviewing {
                source,
                address,
                order,
            } => (source, address, order),
            other => {
                self.state = other;
                return Err(self.invalid("place the order"));
            }
        };

        self.state = CheckoutState::Submitting {
            source: source.clone(),
            address: address.clone(),
        };

        let order = match order {
            Some(order) => order,
            None => match self.create_order(&source, &address).await {
                Ok(order) => order,
                Err(err) => {
                    err.report();
                    self.state = CheckoutState::Failed {
                        message: err.to_string(),
                        source,
                        address,
                        order: None,
                    };
                    return Err(err);
                }
            },
        };

        self.state = CheckoutState::AwaitingPayment {
            source: source.clone(),
            address: address.clone(),
            order: order.clone(),
        };

        match self.payment.initiate_payment(&order.payment).await {
            Ok(PaymentOutcome::Completed { reference }) => {
                let cart_clear_error = if source == CheckoutSource::Cart {
                    self.cart.clear_cart().await.err()
                } else {
                    None
                };
                if let Some(err) = &cart_clear_error {
                    warn!(error = %err, order_id = %order.order_id, "Paid order left items in the cart");
                }

                info!(order_id = %order.order_id, reference = %reference, "Checkout completed");
                self.state = CheckoutState::Completed {
                    order_id: order.order_id.clone(),
                    reference: reference.clone(),
                };
                Ok(CheckoutReport {
                    order_id: order.order_id,
                    outcome: PaymentOutcome::Completed { reference },
                    cart_clear_error,
                })
            }
            Ok(PaymentOutcome::Dismissed) => {
                info!(order_id = %order.order_id, "Checkout payment dismissed");
                let order_id = order.order_id.clone();
                self.state = CheckoutState::Dismissed {
                    source,
                    address,
                    order,
                };
                Ok(CheckoutReport {
                    order_id,
                    outcome: PaymentOutcome::Dismissed,
                    cart_clear_error: None,
                })
            }
            Err(err) => {
                err.report();
                let message = match &err {
                    ApiError::PaymentFailed(reason) => reason.clone(),
                    other => other.to_string(),
                };
                self.state = CheckoutState::Failed {
                    message,
                    source,
                    address,
                    order: Some(order),
                };
                Err(err)
            }
        }
    }

    async fn create_order(
        &self,
        source: &CheckoutSource,
        address: &ShippingAddress,
    ) -> Result<CreatedOrder, ApiError> {
        let items = match source {
            CheckoutSource::Direct { product, quantity } => vec![OrderItemRequest {
                product_id: product.clone(),
                quantity: *quantity,
            }],
            CheckoutSource::Cart => self
                .cart
                .view_cart()
                .await?
                .items
                .into_iter()
                .map(|item| OrderItemRequest {
                    product_id: item.product.id().clone(),
                    quantity: item.quantity,
                })
                .collect(),
        };

        self.orders
            .create_order(&OrderRequest {
                items,
                shipping_address: address.clone(),
            })
            .await
    }

    fn invalid(&self, action: &'static str) -> ApiError {
        ApiError::InvalidTransition {
            state: self.state.name(),
            action,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use mockito::{Matcher, Server};
    use partstore_core::UserId;

    use super::*;
    use crate::catalog::CatalogClient;
    use crate::config::ClientConfig;
    use crate::credential::{CredentialProvider, UserRef};
    use crate::http::ApiClient;
    use crate::payment::testing::{Script, ScriptedPaymentProvider};

    const CART: &str = r#"{"success":true,"data":{"items":[
        {"productId":"p1","quantity":1,"price":80},
        {"productId":"p2","quantity":2,"price":15}],"total":110}}"#;

    const CREATED: &str = r#"{"success":true,"data":{"orderId":"o1",
        "payhere":{"merchant_id":"121","order_id":"o1","amount":"110.00","currency":"LKR"}}}"#;

    fn checkout(server: &Server, script: impl IntoIterator<Item = Script>) -> (Checkout, Arc<ScriptedPaymentProvider>) {
        let credentials = CredentialProvider::new();
        credentials.set_credential(
            "tok",
            UserRef {
                user_id: UserId::new("u1"),
                role: None,
                status: None,
            },
        );
        let config = ClientConfig::with_base_url(&server.url()).unwrap();
        let api = ApiClient::new(&config, credentials).unwrap();
        let catalog = CatalogClient::new(api.clone(), config.catalog_cache);
        let provider = Arc::new(ScriptedPaymentProvider::new(script));
        let checkout = Checkout::new(
            CartService::new(api.clone(), catalog),
            OrderService::new(api),
            PaymentBridge::new(provider.clone(), true),
        );
        (checkout, provider)
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: "12 Galle Road".into(),
            city: "Colombo".into(),
            district: None,
            postal_code: "00300".into(),
            country: "Sri Lanka".into(),
        }
    }

    #[tokio::test]
    async fn test_cart_checkout_completes_and_clears_cart() {
        let mut server = Server::new_async().await;
        let _cart = server
            .mock("GET", "/buyer/cart")
            .with_status(200)
            .with_body(CART)
            .expect_at_least(1)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/buyer/order")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "items": [{"productId":"p1","quantity":1},{"productId":"p2","quantity":2}],
                "shippingAddress": {"city":"Colombo","postalCode":"00300"}
            })))
            .with_status(201)
            .with_body(CREATED)
            .create_async()
            .await;
        let clear = server
            .mock("DELETE", "/buyer/cart/clear")
            .with_status(200)
            .with_body(r#"{"success":true}"#)
            .expect(1)
            .create_async()
            .await;

        let (mut checkout, provider) = checkout(&server, [Script::Complete("ORDER123".into())]);
        checkout.begin(CheckoutSource::Cart).unwrap();
        checkout.submit_address(&address()).unwrap();
        let report = checkout.place_order().await.unwrap();

        create.assert_async().await;
        clear.assert_async().await;
        assert_eq!(
            report.outcome,
            PaymentOutcome::Completed {
                reference: "ORDER123".into()
            }
        );
        assert!(report.cart_clear_error.is_none());
        assert!(matches!(
            checkout.state(),
            CheckoutState::Completed { reference, .. } if reference == "ORDER123"
        ));
        assert_eq!(provider.payloads()[0].get("amount").unwrap(), "110.00");
    }

    #[tokio::test]
    async fn test_dismissed_is_distinct_and_retry_reuses_order() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/buyer/order")
            .with_status(201)
            .with_body(CREATED)
            .expect(1)
            .create_async()
            .await;
        let clear = server
            .mock("DELETE", "/buyer/cart/clear")
            .expect(0)
            .create_async()
            .await;

        let (mut checkout, provider) = checkout(
            &server,
            [Script::Dismiss, Script::Complete("R2".into())],
        );
        checkout
            .begin(CheckoutSource::Direct {
                product: ProductId::new("p1"),
                quantity: 1,
            })
            .unwrap();
        checkout.submit_address(&address()).unwrap();

        let report = checkout.place_order().await.unwrap();
        assert_eq!(report.outcome, PaymentOutcome::Dismissed);
        assert!(matches!(checkout.state(), CheckoutState::Dismissed { .. }));
        assert_eq!(checkout.state().order_id().unwrap().as_str(), "o1");

        checkout.retry_payment().unwrap();
        let report = checkout.place_order().await.unwrap();
        assert!(matches!(report.outcome, PaymentOutcome::Completed { .. }));

        create.assert_async().await;
        clear.assert_async().await;
        assert_eq!(provider.payloads().len(), 2);
    }

    #[tokio::test]
    async fn test_payment_error_fails_with_order_kept() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/buyer/order")
            .with_status(201)
            .with_body(CREATED)
            .create_async()
            .await;

        let (mut checkout, _) = checkout(&server, [Script::Fail("card declined".into())]);
        checkout
            .begin(CheckoutSource::Direct {
                product: ProductId::new("p1"),
                quantity: 1,
            })
            .unwrap();
        checkout.submit_address(&address()).unwrap();

        let err = checkout.place_order().await.unwrap_err();
        assert!(matches!(err, ApiError::PaymentFailed(_)));
        assert!(matches!(
            checkout.state(),
            CheckoutState::Failed { order: Some(_), message, .. } if message == "card declined"
        ));
        checkout.retry_payment().unwrap();
        assert!(matches!(checkout.state(), CheckoutState::Reviewing { order: Some(_), .. }));
    }

    fn direct() -> CheckoutSource {
        CheckoutSource::Direct {
            product: ProductId::new("p1"),
            quantity: 1,
        }
    }

    #[tokio::test]
    async fn test_refused_start_fails_with_order_kept() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/buyer/order")
            .with_status(201)
            .with_body(CREATED)
            .expect(1)
            .create_async()
            .await;

        let (mut checkout, provider) = checkout(
            &server,
            [
                Script::RefuseStart("popup blocked".into()),
                Script::Complete("ORDER123".into()),
            ],
        );
        checkout.begin(direct()).unwrap();
        checkout.submit_address(&address()).unwrap();

        let err = checkout.place_order().await.unwrap_err();
        assert!(matches!(err, ApiError::PaymentGatewayUnavailable(ref m) if m.contains("popup blocked")));
        assert!(matches!(
            checkout.state(),
            CheckoutState::Failed { order: Some(order), .. } if order.order_id.as_str() == "o1"
        ));
        assert!(provider.payloads().is_empty());

        checkout.retry_payment().unwrap();
        let report = checkout.place_order().await.unwrap();

        create.assert_async().await;
        assert_eq!(report.order_id.as_str(), "o1");
        assert!(matches!(checkout.state(), CheckoutState::Completed { .. }));
    }

    #[tokio::test]
    async fn test_callback_after_reset_is_ignored() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/buyer/order")
            .with_status(201)
            .with_body(CREATED)
            .create_async()
            .await;

        let (mut checkout, provider) = checkout(&server, [Script::Hold]);
        checkout.begin(direct()).unwrap();
        checkout.submit_address(&address()).unwrap();

        let pending = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            checkout.place_order(),
        )
        .await;
        assert!(pending.is_err());
        assert!(matches!(checkout.state(), CheckoutState::AwaitingPayment { .. }));

        checkout.reset();
        let callbacks = provider.last_callbacks().unwrap();
        assert!(!callbacks.on_completed("LATE"));
        assert!(!callbacks.on_dismissed());
        assert!(matches!(checkout.state(), CheckoutState::Idle));
    }

    #[tokio::test]
    async fn test_creation_failure_cannot_retry_payment() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/buyer/order")
            .with_status(500)
            .create_async()
            .await;

        let (mut checkout, provider) = checkout(&server, []);
        checkout
            .begin(CheckoutSource::Direct {
                product: ProductId::new("p1"),
                quantity: 1,
            })
            .unwrap();
        checkout.submit_address(&address()).unwrap();

        let err = checkout.place_order().await.unwrap_err();
        assert!(err.is_big_error());
        assert!(matches!(checkout.state(), CheckoutState::Failed { order: None, .. }));
        assert!(matches!(
            checkout.retry_payment().unwrap_err(),
            ApiError::InvalidTransition { .. }
        ));
        assert_eq!(provider.load_count(), 0);

        checkout.begin(CheckoutSource::Cart).unwrap();
    }

    #[tokio::test]
    async fn test_incomplete_address_stays_in_collection() {
        let server = Server::new_async().await;
        let (mut checkout, _) = checkout(&server, []);
        checkout.begin(CheckoutSource::Cart).unwrap();

        let err = checkout
            .submit_address(&ShippingAddress {
                city: "  ".into(),
                ..address()
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m.contains("city")));
        assert!(matches!(checkout.state(), CheckoutState::AddressCollection { .. }));

        checkout
            .submit_address(&ShippingAddress {
                district: None,
                ..address()
            })
            .unwrap();
        assert!(matches!(checkout.state(), CheckoutState::Reviewing { .. }));
    }

    #[tokio::test]
    async fn test_illegal_transitions_leave_state() {
        let server = Server::new_async().await;
        let (mut checkout, _) = checkout(&server, []);

        let err = checkout.place_order().await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot place the order while checkout is idle");
        assert!(matches!(checkout.state(), CheckoutState::Idle));

        assert!(checkout.submit_address(&address()).is_err());
        assert!(checkout.cancel().is_err());

        checkout.begin(CheckoutSource::Cart).unwrap();
        assert!(checkout.begin(CheckoutSource::Cart).is_err());
        checkout.cancel().unwrap();
        assert!(matches!(checkout.state(), CheckoutState::Idle));
    }

    #[tokio::test]
    async fn test_empty_cart_fails_before_order() {
        let mut server = Server::new_async().await;
        let _cart = server
            .mock("GET", "/buyer/cart")
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"items":[],"total":0}}"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/buyer/order")
            .expect(0)
            .create_async()
            .await;

        let (mut checkout, _) = checkout(&server, []);
        checkout.begin(CheckoutSource::Cart).unwrap();
        checkout.submit_address(&address()).unwrap();
        let err = checkout.place_order().await.unwrap_err();

        create.assert_async().await;
        assert_eq!(err.to_string(), "Your cart is empty");
    }
}
