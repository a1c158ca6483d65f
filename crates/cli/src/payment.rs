//! Terminal payment provider.
//!
//! There is no browser to host the payment widget, so the payload is printed
//! for the operator, who completes the payment out of band and types the
//! result:
//!
//! ```text
//! completed <reference>
//! dismissed
//! error <reason>
//! ```

use async_trait::async_trait;
use partstore_client::{PaymentCallbacks, PaymentPayload, PaymentProvider, ProviderError};
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use crate::output;

/// A line typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Completed(String),
    Dismissed,
    Error(String),
}

impl Reply {
    /// Parse one line of operator input.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match word.to_ascii_lowercase().as_str() {
            "completed" | "complete" | "ok" if !rest.is_empty() => {
                Some(Self::Completed(rest.to_string()))
            }
            "dismissed" | "dismiss" | "cancel" => Some(Self::Dismissed),
            "error" | "failed" => Some(Self::Error(if rest.is_empty() {
                "payment failed".to_string()
            } else {
                rest.to_string()
            })),
            _ => None,
        }
    }

    fn deliver(self, callbacks: &PaymentCallbacks) -> bool {
        match self {
            Self::Completed(reference) => callbacks.on_completed(reference),
            Self::Dismissed => callbacks.on_dismissed(),
            Self::Error(reason) => callbacks.on_error(reason),
        }
    }
}

/// Prints the payload and reads the outcome from stdin.
#[derive(Debug, Clone)]
pub struct TerminalPaymentProvider {
    http: reqwest::Client,
    script_url: Url,
}

impl TerminalPaymentProvider {
    #[must_use]
    pub fn new(script_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            script_url,
        }
    }
}

#[async_trait]
impl PaymentProvider for TerminalPaymentProvider {
    /// Check that the payment gateway's script is reachable.
    async fn load(&self) -> Result<(), ProviderError> {
        let response = self
            .http
            .get(self.script_url.clone())
            .send()
            .await
            .map_err(|e| ProviderError::Load(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Load(format!(
                "{} answered {}",
                self.script_url,
                response.status()
            )));
        }

        tracing::debug!(url = %self.script_url, "Payment gateway reachable");
        Ok(())
    }

    fn start_payment(
        &self,
        payload: &PaymentPayload,
        callbacks: PaymentCallbacks,
    ) -> Result<(), ProviderError> {
        let json = serde_json::to_string_pretty(payload)
            .map_err(|e| ProviderError::Start(e.to_string()))?;
        output::payment_prompt(&json);

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match Reply::parse(&line) {
                        Some(reply) => {
                            reply.deliver(&callbacks);
                            break;
                        }
                        None => output::payment_retry_hint(),
                    },
                    Ok(None) => {
                        callbacks.on_dismissed();
                        break;
                    }
                    Err(e) => {
                        callbacks.on_error(format!("could not read payment result: {e}"));
                        break;
                    }
                }
            }
        });

        Ok(())
    }
}
