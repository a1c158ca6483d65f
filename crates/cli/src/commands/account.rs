//! Sign-in, profile, complaints and images.

use std::path::Path;

use partstore_client::{ApiError, Complaint, RegisterRequest};
use partstore_core::{Email, ImageId, OrderId, Price, ProductId, Role};

use super::Context;
use crate::error::CliError;
use crate::output;

pub async fn login(ctx: &Context, email: &str, password: &str) -> Result<(), CliError> {
    let user = ctx.storefront().auth().login(email, password).await?;
    ctx.emit(&user, output::user)
}

/// Registration details as typed on the command line.
pub struct Registration<'a> {
    pub email: &'a str,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub role: &'a str,
}

pub async fn register(ctx: &Context, registration: Registration<'_>) -> Result<(), CliError> {
    let role: Role = registration
        .role
        .parse()
        .map_err(CliError::InvalidInput)?;
    let request = RegisterRequest {
        email: Email::parse(registration.email).map_err(ApiError::from)?,
        password: registration.password,
        role,
        name: registration.name,
        phone: registration.phone,
    };

    let user = ctx.storefront().auth().register(&request).await?;
    ctx.emit(&user, output::user)
}

pub fn logout(ctx: &Context) {
    ctx.storefront().auth().logout();
    output::notice("Signed out.");
}

pub fn whoami(ctx: &Context) -> Result<(), CliError> {
    match ctx.storefront().credentials().user() {
        Some(user) => ctx.emit(&user, output::user),
        None => Err(ApiError::Unauthenticated("Not signed in".to_string()).into()),
    }
}

pub async fn profile(ctx: &Context) -> Result<(), CliError> {
    let profile = ctx.storefront().account().profile().await?;
    ctx.emit(&profile, output::profile)
}

pub async fn complain(
    ctx: &Context,
    order: &str,
    product: &str,
    description: String,
    refund_amount: Option<&str>,
) -> Result<(), CliError> {
    let refund_amount = refund_amount
        .map(|amount| {
            amount
                .parse::<Price>()
                .map_err(|e| CliError::InvalidInput(e.to_string()))
        })
        .transpose()?;

    let complaint = Complaint {
        product_id: ProductId::new(product),
        description,
        refund_requested: refund_amount.is_some(),
        refund_amount,
    };

    ctx.storefront()
        .account()
        .make_complaint(&OrderId::new(order), &complaint)
        .await?;
    output::notice("Complaint submitted.");
    Ok(())
}

pub async fn image(ctx: &Context, id: &str, path: &Path) -> Result<(), CliError> {
    let bytes = ctx.storefront().account().image(&ImageId::new(id)).await?;
    tokio::fs::write(path, &bytes).await?;
    output::notice(&format!("Wrote {} bytes to {}", bytes.len(), path.display()));
    Ok(())
}
