//! Command handlers.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

use partstore_client::Storefront;
use serde::Serialize;

use crate::error::CliError;
use crate::output;

/// What every handler needs.
pub struct Context {
    storefront: Storefront,
    json: bool,
}

impl Context {
    #[must_use]
    pub const fn new(storefront: Storefront, json: bool) -> Self {
        Self { storefront, json }
    }

    #[must_use]
    pub const fn storefront(&self) -> &Storefront {
        &self.storefront
    }

    /// Print `value` as JSON or with `human`.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON output fails.
    pub fn emit<T: Serialize + ?Sized>(&self, value: &T, human: impl FnOnce(&T)) -> Result<(), CliError> {
        if self.json {
            output::json(value)
        } else {
            human(value);
            Ok(())
        }
    }
}
