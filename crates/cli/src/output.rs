//! Terminal rendering.
//!
//! Results go to stdout, prompts and errors to stderr. With `--json` every
//! result is printed as JSON instead.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use partstore_client::{
    ApiError, Cart, CheckoutReport, Disposition, FilterOptions, Order, PaymentOutcome, Product,
    Profile, UserRef,
};
use partstore_core::StatusTimeline;
use serde::Serialize;

use crate::error::CliError;

/// Print `value` as pretty JSON.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialised.
pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn line(text: &str) {
    println!("{text}");
}

pub fn user(user: &UserRef) {
    match user.role {
        Some(role) => println!("Signed in as {} ({role})", user.user_id),
        None => println!("Signed in as {}", user.user_id),
    }
}

pub fn products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found.");
        return;
    }
    for product in products {
        println!(
            "{:<26} {:<40} {:>10}  stock {}",
            product.id, product.title, product.price, product.stock
        );
    }
}

pub fn product(product: &Product) {
    println!("{}", product.title);
    println!("  id:        {}", product.id);
    println!("  price:     {}", product.price);
    println!("  stock:     {}", product.stock);
    if let Some(brand) = &product.brand {
        println!("  brand:     {brand}");
    }
    if let Some(condition) = &product.condition {
        println!("  condition: {condition}");
    }
    if !product.make.is_empty() {
        println!("  make:      {}", product.make.join(", "));
    }
    if !product.model.is_empty() {
        println!("  model:     {}", product.model.join(", "));
    }
}

pub fn filter_options(options: &FilterOptions) {
    let rows = [
        ("condition", &options.condition),
        ("brand", &options.brand),
        ("make", &options.make),
        ("model", &options.model),
        ("years", &options.years),
        ("material", &options.material),
        ("availability", &options.availability),
    ];
    for (name, values) in rows {
        if !values.is_empty() {
            println!("{name:<13} {}", values.join(", "));
        }
    }
    if let Some(range) = &options.price_range {
        println!("{:<13} {} - {}", "price", range.min, range.max);
    }
}

pub fn cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for item in &cart.items {
        let title = item.product.title().unwrap_or_else(|| item.product.id().as_str());
        match item.unit_price() {
            Some(price) => println!("{:>3} x {title:<40} {:>10}", item.quantity, price * item.quantity),
            None => println!("{:>3} x {title}", item.quantity),
        }
    }
    println!("Total: {}", cart.total);
}

pub fn orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders yet.");
        return;
    }
    for order in orders {
        let placed = order
            .created_at
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d").to_string());
        let total = order
            .total_amount
            .map_or_else(|| "-".to_string(), |total| total.to_string());
        println!(
            "{:<26} {placed}  {:>10}  {} line(s)  {}",
            order.id,
            total,
            order.items.len(),
            order.status.as_deref().unwrap_or("")
        );
    }
}

pub fn timeline(timeline: &StatusTimeline) {
    if timeline.is_empty() {
        println!("No status updates yet.");
        return;
    }
    for entry in timeline.entries() {
        let at = entry
            .updated_at
            .map_or_else(|| "pending".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        match &entry.product_title {
            Some(title) => println!("{at:<17} {:<20} {title}", entry.status),
            None => println!("{at:<17} {}", entry.status),
        }
    }
}

pub fn profile(profile: &Profile) {
    if let Some(name) = &profile.name {
        println!("name:  {name}");
    }
    if let Some(email) = &profile.email {
        println!("email: {email}");
    }
    if let Some(phone) = &profile.phone {
        println!("phone: {phone}");
    }
    if let Some(role) = profile.role {
        println!("role:  {role}");
    }
}

pub fn checkout_report(report: &CheckoutReport) {
    match &report.outcome {
        PaymentOutcome::Completed { reference } => {
            println!("Payment completed for order {} (reference {reference}).", report.order_id);
        }
        PaymentOutcome::Dismissed => {
            println!(
                "Payment for order {} was dismissed. Pass --attempts to offer payment again in the same run.",
                report.order_id
            );
        }
    }
    if let Some(err) = &report.cart_clear_error {
        eprintln!("warning: the order is paid but the cart could not be emptied: {err}");
    }
}

pub fn payment_prompt(payload: &str) {
    eprintln!("Complete the payment with these details:");
    eprintln!("{payload}");
    eprintln!("Then type `completed <reference>`, `dismissed` or `error <reason>`:");
}

pub fn payment_retry_hint() {
    eprintln!("Type `completed <reference>`, `dismissed` or `error <reason>`:");
}

pub fn notice(text: &str) {
    eprintln!("{text}");
}

/// Print an error the way its disposition asks for.
pub fn error(err: &CliError) {
    match err.disposition() {
        Disposition::Inline => eprintln!("error: {err}"),
        Disposition::RedirectToLogin => {
            eprintln!("{err}");
            eprintln!("Please log in: partstore login --email <email>");
        }
        Disposition::FullPage => {
            let code = match err {
                CliError::Api(api) => api.code(),
                _ => 0,
            };
            eprintln!("==============================================================");
            if code > 0 {
                eprintln!(" Something went wrong ({code})");
            } else {
                eprintln!(" Something went wrong");
            }
            eprintln!(" {err}");
            eprintln!("==============================================================");
            if matches!(err, CliError::Api(ApiError::TransientNetwork(_))) {
                eprintln!("Check your connection and try again.");
            }
        }
    }
}
