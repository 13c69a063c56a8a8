//! Error types for the Daraja STK client library.

use rust_decimal::Decimal;

use crate::models::CheckoutRequestId;

/// Convenient alias for results produced by this crate.
pub type Result<T> = core::result::Result<T, DarajaError>;

/// All errors that can occur when using the Daraja STK client.
///
/// The three initiation-time failure classes the gateway distinguishes
/// (credential rejection, request validation, business rejection) map to
/// [`DarajaError::Auth`], [`DarajaError::InvalidPhoneNumber`] /
/// [`DarajaError::InvalidAmount`] and [`DarajaError::Gateway`]
/// respectively. All of them are terminal; the crate never retries.
#[derive(Debug, thiserror::Error)]
pub enum DarajaError {
    /// Payer phone number does not match the required MSISDN pattern.
    #[error("invalid phone number `{value}`: expected 12 digits with a 2547/2541 prefix")]
    InvalidPhoneNumber {
        /// The rejected input.
        value: String,
    },

    /// Payment amount is zero or negative.
    #[error("invalid amount {value}: must be positive")]
    InvalidAmount {
        /// The rejected amount.
        value: Decimal,
    },

    /// Client configuration is incomplete or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport failure while talking to the gateway.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The token endpoint rejected the service credentials.
    #[error("gateway authentication failed (status {status}): {message}")]
    Auth {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Gateway-provided error body, verbatim.
        message: String,
    },

    /// The gateway refused to initiate the push (business rejection).
    #[error("gateway rejected request (status {status}, code {code}): {message}")]
    Gateway {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Gateway error or response code.
        code: String,
        /// Human-readable gateway message.
        message: String,
    },

    /// A pending payment already exists for this checkout identifier.
    #[error("pending payment already exists for checkout request `{0}`")]
    DuplicatePayment(CheckoutRequestId),

    /// Payment store backend failed.
    #[error("payment store error: {0}")]
    Store(Box<dyn core::error::Error + Send + Sync>),
}
