//! Catalog browsing.

use partstore_client::SearchFilters;
use partstore_core::ProductId;

use super::Context;
use crate::error::CliError;
use crate::output;

pub async fn list(ctx: &Context, page: u32, limit: u32) -> Result<(), CliError> {
    let page = ctx.storefront().catalog().list_products(page, limit).await?;
    ctx.emit(page.items.as_slice(), output::products)?;
    if page.has_more(limit) {
        output::notice("More products are available; pass --page to see the next page.");
    }
    Ok(())
}

pub async fn search(ctx: &Context, filters: &[String]) -> Result<(), CliError> {
    let filters = parse_filters(filters)?;
    let products = ctx.storefront().catalog().search_products(&filters).await?;
    ctx.emit(products.as_slice(), output::products)
}

pub async fn show(ctx: &Context, id: &str) -> Result<(), CliError> {
    let product = ctx
        .storefront()
        .catalog()
        .get_product(&ProductId::new(id))
        .await?;
    ctx.emit(&product, output::product)
}

pub async fn filters(ctx: &Context) -> Result<(), CliError> {
    let options = ctx.storefront().catalog().filter_options().await?;
    ctx.emit(&options, output::filter_options)
}

/// Turn `key=value` arguments into search filters. A value containing
/// commas becomes a multi-valued filter.
fn parse_filters(args: &[String]) -> Result<SearchFilters, CliError> {
    args.iter().try_fold(SearchFilters::new(), |filters, arg| {
        let (key, value) = arg
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| CliError::InvalidInput(format!("expected KEY=VALUE, got `{arg}`")))?;

        let key = key.trim();
        Ok(if value.contains(',') {
            filters.with_all(key, value.split(','))
        } else {
            filters.with(key, value)
        })
    })
}
