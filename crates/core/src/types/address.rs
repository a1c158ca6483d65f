//! Shipping address collected at checkout.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A mandatory address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressField {
    Street,
    City,
    PostalCode,
    Country,
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Street => "street",
            Self::City => "city",
            Self::PostalCode => "postal code",
            Self::Country => "country",
        })
    }
}

/// Validation failure for a [`ShippingAddress`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("please fill all required fields (missing: {})", format_fields(.missing))]
pub struct AddressError {
    /// Every mandatory field that was empty, in form order.
    pub missing: Vec<AddressField>,
}

fn format_fields(fields: &[AddressField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where an order is shipped.
///
/// `street`, `city`, `postal_code` and `country` are mandatory; `district`
/// is optional and never blocks checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Check that every mandatory field is present.
    ///
    /// Whitespace-only values count as empty.
    ///
    /// # Errors
    ///
    /// Returns an [`AddressError`] listing all missing fields.
    pub fn validate(&self) -> Result<(), AddressError> {
        let missing: Vec<AddressField> = [
            (AddressField::Street, &self.street),
            (AddressField::City, &self.city),
            (AddressField::PostalCode, &self.postal_code),
            (AddressField::Country, &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AddressError { missing })
        }
    }

    /// Copy with surrounding whitespace removed and an empty district dropped.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            street: self.street.trim().to_owned(),
            city: self.city.trim().to_owned(),
            district: self
                .district
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_owned),
            postal_code: self.postal_code.trim().to_owned(),
            country: self.country.trim().to_owned(),
        }
    }
}

impl fmt::Display for ShippingAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}",
            self.street,
            self.city,
            self.district.as_deref().unwrap_or("N/A"),
            self.postal_code,
            self.country
        )
    }
}
