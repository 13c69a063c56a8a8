//! Wire types for the token and STK push endpoints.
//!
//! Field names follow the gateway's JSON exactly; the odd mixture of
//! casings (`BusinessShortCode`, `CallBackURL`, `access_token`) is the
//! gateway's, not ours.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CheckoutRequestId, MerchantRequestId};

/// Response from the OAuth client-credentials token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Opaque short-lived bearer token.
    pub access_token: String,
    /// Remaining validity in seconds (the gateway sends this as a string).
    pub expires_in: String,
}

/// Request body for the STK push initiation endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushRequest {
    /// Payee business shortcode.
    pub business_short_code: String,
    /// Base64 password derived from `shortcode + passkey + timestamp`.
    pub password: String,
    /// Timestamp the password was derived from, `YYYYMMDDHHmmss`.
    pub timestamp: String,
    /// Transaction type constant (`CustomerPayBillOnline`).
    pub transaction_type: String,
    /// Amount to request from the payer.
    pub amount: Decimal,
    /// Paying party (the payer's phone number).
    pub party_a: String,
    /// Receiving party (the business shortcode).
    pub party_b: String,
    /// Phone number to prompt.
    pub phone_number: String,
    /// URL the gateway will invoke asynchronously with the result.
    #[serde(rename = "CallBackURL")]
    pub call_back_url: String,
    /// Account reference shown on the payer's prompt.
    pub account_reference: String,
    /// Free-text transaction description.
    pub transaction_desc: String,
}

/// Successful acceptance body from the STK push endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StkPushResponse {
    /// Gateway-issued merchant request identifier.
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: MerchantRequestId,
    /// Gateway-issued checkout request identifier; the correlation key
    /// for the later callback.
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: CheckoutRequestId,
    /// `"0"` when the request was accepted for processing.
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    /// Human-readable acceptance description.
    #[serde(rename = "ResponseDescription")]
    pub response_description: String,
    /// Message suitable for showing to the paying customer.
    #[serde(rename = "CustomerMessage")]
    pub customer_message: String,
}

/// Error body the gateway attaches to non-success HTTP statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayErrorBody {
    /// Gateway-side request trace identifier.
    #[serde(rename = "requestId", default)]
    pub request_id: Option<String>,
    /// Machine-readable error code, e.g. `400.002.02`.
    #[serde(rename = "errorCode")]
    pub error_code: String,
    /// Human-readable error message.
    #[serde(rename = "errorMessage")]
    pub error_message: String,
}
