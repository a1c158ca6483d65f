//! Partstore Core - Shared domain types.
//!
//! This crate provides the types shared by every partstore component:
//! - `client` - REST client, cart and checkout orchestration
//! - `cli` - Command-line storefront front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure validation logic - no I/O and
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, shipping addresses and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
