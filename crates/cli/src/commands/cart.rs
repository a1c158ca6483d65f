//! Cart commands. Each prints the cart as the server reports it afterwards.

use partstore_core::ProductId;

use super::Context;
use crate::error::CliError;
use crate::output;

pub async fn view(ctx: &Context) -> Result<(), CliError> {
    let cart = ctx.storefront().cart().view_cart().await?;
    ctx.emit(&cart, output::cart)
}

pub async fn add(ctx: &Context, product: &str, quantity: u32) -> Result<(), CliError> {
    let cart = ctx
        .storefront()
        .cart()
        .add_to_cart(&ProductId::new(product), quantity)
        .await?;
    ctx.emit(&cart, output::cart)
}

pub async fn update(ctx: &Context, product: &str, quantity: u32) -> Result<(), CliError> {
    let cart = ctx
        .storefront()
        .cart()
        .update_cart_item(&ProductId::new(product), quantity)
        .await?;
    ctx.emit(&cart, output::cart)
}

pub async fn remove(ctx: &Context, product: &str) -> Result<(), CliError> {
    let cart = ctx
        .storefront()
        .cart()
        .remove_from_cart(&ProductId::new(product))
        .await?;
    ctx.emit(&cart, output::cart)
}

pub async fn clear(ctx: &Context) -> Result<(), CliError> {
    let cart = ctx.storefront().cart().clear_cart().await?;
    ctx.emit(&cart, output::cart)
}
