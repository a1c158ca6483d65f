//! Scripted payment provider for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{PaymentCallbacks, PaymentProvider, ProviderError};
use crate::types::PaymentPayload;

/// What the scripted provider does when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Fire `on_completed` with the reference.
    Complete(String),
    /// Fire `on_dismissed`.
    Dismiss,
    /// Fire `on_error` with the reason.
    Fail(String),
    /// Refuse to start the session.
    RefuseStart(String),
    /// Drop the callbacks without firing any.
    Abandon,
    /// Keep the callbacks for the test to fire through
    /// [`ScriptedPaymentProvider::last_callbacks`].
    Hold,
}

/// A [`PaymentProvider`] that plays back a fixed script, one step per
/// session. An exhausted script holds.
#[derive(Debug, Default)]
pub struct ScriptedPaymentProvider {
    script: Mutex<VecDeque<Script>>,
    failing_loads: AtomicUsize,
    loads: AtomicUsize,
    payloads: Mutex<Vec<PaymentPayload>>,
    last_callbacks: Mutex<Option<PaymentCallbacks>>,
}

impl ScriptedPaymentProvider {
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = Script>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Fail the first `n` loads.
    #[must_use]
    pub fn failing_loads(self, n: usize) -> Self {
        self.failing_loads.store(n, Ordering::SeqCst);
        self
    }

    /// Number of load attempts so far.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Payloads the provider was started with, oldest first.
    #[must_use]
    pub fn payloads(&self) -> Vec<PaymentPayload> {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Callbacks of the most recent session, if it was not abandoned.
    #[must_use]
    pub fn last_callbacks(&self) -> Option<PaymentCallbacks> {
        self.last_callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PaymentProvider for ScriptedPaymentProvider {
    async fn load(&self) -> Result<(), ProviderError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let remaining = self.failing_loads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_loads.store(remaining - 1, Ordering::SeqCst);
            return Err(ProviderError::Load("script returned 503".to_string()));
        }
        Ok(())
    }

    fn start_payment(
        &self,
        payload: &PaymentPayload,
        callbacks: PaymentCallbacks,
    ) -> Result<(), ProviderError> {
        let step = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Script::Hold);

        if let Script::RefuseStart(reason) = step {
            return Err(ProviderError::Start(reason));
        }

        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());

        let mut last = self
            .last_callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match step {
            Script::Complete(reference) => {
                callbacks.on_completed(reference);
                *last = Some(callbacks);
            }
            Script::Dismiss => {
                callbacks.on_dismissed();
                *last = Some(callbacks);
            }
            Script::Fail(reason) => {
                callbacks.on_error(reason);
                *last = Some(callbacks);
            }
            Script::Hold => *last = Some(callbacks),
            Script::Abandon => *last = None,
            Script::RefuseStart(_) => {}
        }

        Ok(())
    }
}
