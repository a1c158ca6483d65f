//! Order history, tracking and cancellation.

use partstore_client::OrderHistory;
use partstore_core::{OrderId, ProductId};

use super::Context;
use crate::error::CliError;
use crate::output;

pub async fn history(ctx: &Context, page: u32, limit: u32, all: bool) -> Result<(), CliError> {
    let orders = ctx.storefront().orders();

    if !all {
        let page = orders.order_history(page, limit).await?;
        ctx.emit(page.items.as_slice(), output::orders)?;
        if page.has_more(limit) {
            output::notice("More orders are available; pass --page or --all.");
        }
        return Ok(());
    }

    let mut history = OrderHistory::new(limit);
    while history.has_more() {
        orders.load_more(&mut history).await?;
    }
    ctx.emit(history.orders(), output::orders)
}

pub async fn track(ctx: &Context, order: &str, product: &str) -> Result<(), CliError> {
    let timeline = ctx
        .storefront()
        .orders()
        .track_order(&OrderId::new(order), &ProductId::new(product))
        .await?;
    ctx.emit(&timeline, output::timeline)
}

pub async fn cancel(ctx: &Context, order: &str) -> Result<(), CliError> {
    ctx.storefront()
        .orders()
        .cancel_order(&OrderId::new(order))
        .await?;
    output::notice(&format!("Order {order} cancelled."));
    Ok(())
}
