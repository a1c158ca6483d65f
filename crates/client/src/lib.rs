//! Storefront client for the partstore auto-parts backend.
//!
//! The crate is organised around [`Storefront`], a cheap-to-clone handle that
//! owns one [`ApiClient`] and one [`CredentialProvider`] and hands out the
//! per-area services:
//!
//! - [`AuthService`] - login, registration, logout
//! - [`CatalogClient`] - product listing, search and lookups (cached)
//! - [`CartService`] - stock-checked cart mutations, re-synced from the server
//! - [`Checkout`] - the order placement state machine
//! - [`PaymentBridge`] - single-shot adapter over a callback payment provider
//! - [`OrderService`] - order history, tracking and cancellation
//! - [`AccountService`] - complaints, profile and images
//!
//! Every operation returns [`ApiError`], which knows whether it is a "big"
//! (systemic) error and how it should be surfaced.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod auth;
mod cache;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod orders;
pub mod payment;
pub mod state;
pub mod types;

pub use account::AccountService;
pub use auth::AuthService;
pub use cart::CartService;
pub use catalog::CatalogClient;
pub use checkout::{Checkout, CheckoutReport, CheckoutSource, CheckoutState};
pub use config::{ClientConfig, ConfigError};
pub use credential::{CredentialProvider, CredentialStore, StoredCredential, UserRef};
pub use error::{ApiError, Disposition, ErrorShape};
pub use http::ApiClient;
pub use orders::{OrderHistory, OrderService};
pub use payment::{PaymentBridge, PaymentCallbacks, PaymentOutcome, PaymentProvider, ProviderError};
pub use state::Storefront;
pub use types::*;
