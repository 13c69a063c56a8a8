//! Payer phone number with gateway-format validation.

use serde::{Deserialize, Serialize};

use crate::error::{DarajaError, Result};

/// A validated payer phone number in international MSISDN format.
///
/// The gateway only accepts Kenyan mobile numbers written as twelve
/// digits with a `2547` or `2541` prefix, e.g. `254712345678`. Local
/// formats such as `0712345678` are rejected at construction time, so a
/// value of this type is always safe to put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parses and validates a phone number.
    ///
    /// # Errors
    ///
    /// Returns [`DarajaError::InvalidPhoneNumber`] if the input is not
    /// twelve ASCII digits starting with `2547` or `2541`.
    #[inline]
    pub fn new<T: Into<String>>(value: T) -> Result<Self> {
        let value = value.into();
        if is_valid_msisdn(&value) {
            Ok(Self(value))
        } else {
            Err(DarajaError::InvalidPhoneNumber { value })
        }
    }

    /// Returns the number as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner string.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for PhoneNumber {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for PhoneNumber {
    type Err = DarajaError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for PhoneNumber {
    #[inline]
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Checks the MSISDN shape: twelve digits, `2547` or `2541` prefix.
fn is_valid_msisdn(value: &str) -> bool {
    value.len() == 12
        && value.bytes().all(|b| b.is_ascii_digit())
        && (value.starts_with("2547") || value.starts_with("2541"))
}
