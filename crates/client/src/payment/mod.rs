//! Payment bridge over a callback-driven payment provider.
//!
//! Hosted payment SDKs report their result through three callbacks
//! (completed, dismissed, error) rather than a return value. The bridge turns
//! one payment session into a single awaited [`PaymentOutcome`]:
//!
//! 1. The provider is loaded at most once per bridge. Concurrent callers wait
//!    for the same load; a failed load is retried by the next caller.
//! 2. The payload is stamped with the configured `sandbox` flag.
//! 3. The provider is started with a fresh set of [`PaymentCallbacks`].
//! 4. The first callback to fire settles the session. Later callbacks are
//!    ignored.

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{OnceCell, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::error::{ApiError, add_breadcrumb};
use crate::types::PaymentPayload;

/// How a payment session ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The provider confirmed the payment.
    Completed { reference: String },
    /// The user closed the payment window without paying.
    Dismissed,
}

/// Failure inside a payment provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("payment script could not be loaded: {0}")]
    Load(String),

    #[error("payment could not be started: {0}")]
    Start(String),
}

/// A hosted payment SDK.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Load the SDK (e.g. fetch its script). Called at most once per bridge
    /// unless it fails.
    async fn load(&self) -> Result<(), ProviderError>;

    /// Open the payment UI for `payload` and report the result through
    /// `callbacks`. Must return once the session has started, not when it
    /// ends.
    fn start_payment(
        &self,
        payload: &PaymentPayload,
        callbacks: PaymentCallbacks,
    ) -> Result<(), ProviderError>;
}

#[derive(Debug)]
enum Signal {
    Completed(String),
    Dismissed,
    Error(String),
}

/// Single-shot result handle given to a provider for one session.
///
/// Clones share the same slot: whichever callback fires first settles the
/// session and every later call returns `false`.
#[derive(Clone)]
pub struct PaymentCallbacks {
    slot: Arc<Mutex<Option<oneshot::Sender<Signal>>>>,
}

impl fmt::Debug for PaymentCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentCallbacks")
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl PaymentCallbacks {
    fn channel() -> (Self, oneshot::Receiver<Signal>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// The provider confirmed payment with `reference`.
    pub fn on_completed(&self, reference: impl Into<String>) -> bool {
        self.settle(Signal::Completed(reference.into()))
    }

    /// The user closed the payment window.
    pub fn on_dismissed(&self) -> bool {
        self.settle(Signal::Dismissed)
    }

    /// The provider reported an error.
    pub fn on_error(&self, reason: impl Into<String>) -> bool {
        self.settle(Signal::Error(reason.into()))
    }

    /// Whether a callback has already fired.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn settle(&self, signal: Signal) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(tx) => {
                if tx.send(signal).is_err() {
                    debug!("Payment callback fired after the session was abandoned");
                    return false;
                }
                true
            }
            None => {
                debug!(?signal, "Ignoring payment callback for a settled session");
                false
            }
        }
    }
}

/// Turns a [`PaymentProvider`] into an awaitable payment call.
#[derive(Clone)]
pub struct PaymentBridge {
    inner: Arc<PaymentBridgeInner>,
}

struct PaymentBridgeInner {
    provider: Arc<dyn PaymentProvider>,
    loaded: OnceCell<()>,
    sandbox: bool,
}

impl fmt::Debug for PaymentBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentBridge")
            .field("loaded", &self.is_loaded())
            .field("sandbox", &self.inner.sandbox)
            .finish_non_exhaustive()
    }
}

impl PaymentBridge {
    #[must_use]
    pub fn new(provider: Arc<dyn PaymentProvider>, sandbox: bool) -> Self {
        Self {
            inner: Arc::new(PaymentBridgeInner {
                provider,
                loaded: OnceCell::new(),
                sandbox,
            }),
        }
    }

    /// Whether the provider has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.inner.loaded.initialized()
    }

    /// Run one payment session for `payload` and wait for its result.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::PaymentGatewayUnavailable` if the provider cannot
    /// be loaded or started, and `ApiError::PaymentFailed` if the provider
    /// reports an error or abandons the session without a result.
    #[instrument(skip(self, payload))]
    pub async fn initiate_payment(
        &self,
        payload: &PaymentPayload,
    ) -> Result<PaymentOutcome, ApiError> {
        self.ensure_loaded().await?;

        let payload = payload.clone().with_sandbox(self.inner.sandbox);
        let (callbacks, result) = PaymentCallbacks::channel();

        self.inner
            .provider
            .start_payment(&payload, callbacks)
            .map_err(|e| {
                warn!(error = %e, "Payment provider failed to start");
                ApiError::PaymentGatewayUnavailable(e.to_string())
            })?;
        add_breadcrumb("payment", "Payment started", &[]);

        match result.await {
            Ok(Signal::Completed(reference)) => {
                info!(reference = %reference, "Payment completed");
                Ok(PaymentOutcome::Completed { reference })
            }
            Ok(Signal::Dismissed) => {
                info!("Payment dismissed");
                Ok(PaymentOutcome::Dismissed)
            }
            Ok(Signal::Error(reason)) => {
                warn!(reason = %reason, "Payment provider reported an error");
                Err(ApiError::PaymentFailed(reason))
            }
            Err(_) => Err(ApiError::PaymentFailed(
                "payment session ended without a result".to_string(),
            )),
        }
    }

    async fn ensure_loaded(&self) -> Result<(), ApiError> {
        self.inner
            .loaded
            .get_or_try_init(|| async {
                debug!("Loading payment provider");
                self.inner.provider.load().await
            })
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!(error = %e, "Payment provider failed to load");
                ApiError::PaymentGatewayUnavailable(e.to_string())
            })
    }
}
