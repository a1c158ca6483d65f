//! Checkout command.

use partstore_client::{ApiError, CheckoutReport, CheckoutSource, CheckoutState, PaymentOutcome};
use partstore_core::ShippingAddress;

use super::Context;
use crate::error::CliError;
use crate::output;

/// Run a checkout, offering payment up to `attempts` times. A dismissed or
/// failed payment is retried against the same order.
pub async fn run(
    ctx: &Context,
    source: CheckoutSource,
    address: &ShippingAddress,
    attempts: u32,
) -> Result<(), CliError> {
    let mut checkout = ctx.storefront().checkout();
    checkout.begin(source)?;
    checkout.submit_address(address)?;

    let mut remaining = attempts.max(1);
    loop {
        remaining -= 1;
        let result = checkout.place_order().await;

        let retryable = match (&result, checkout.state()) {
            (Ok(report), _) => report.outcome == PaymentOutcome::Dismissed,
            (Err(_), CheckoutState::Failed { order: Some(_), .. }) => true,
            (Err(_), _) => false,
        };

        if retryable && remaining > 0 {
            match &result {
                Ok(_) => output::notice("Payment dismissed; offering payment again."),
                Err(err) => output::notice(&format!("{err}; offering payment again.")),
            }
            checkout.retry_payment()?;
            continue;
        }

        return finish(ctx, result);
    }
}

fn finish(ctx: &Context, result: Result<CheckoutReport, ApiError>) -> Result<(), CliError> {
    let report = result?;
    let (status, reference) = match &report.outcome {
        PaymentOutcome::Completed { reference } => ("completed", Some(reference.as_str())),
        PaymentOutcome::Dismissed => ("dismissed", None),
    };
    let cart_clear_error = report.cart_clear_error.as_ref().map(ToString::to_string);
    let summary = serde_json::json!({
        "orderId": report.order_id,
        "status": status,
        "reference": reference,
        "cartClearError": cart_clear_error,
    });
    ctx.emit(&summary, |_| output::checkout_report(&report))
}
