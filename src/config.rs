//! Gateway configuration.

use secrecy::SecretString;

/// Static configuration for talking to the payment gateway.
///
/// Built once at process start and handed to
/// [`crate::client::DarajaClient`]; business logic never reads ambient
/// environment state. Secret material is wrapped in [`SecretString`] so
/// it stays out of debug output and logs.
#[derive(Debug)]
pub struct GatewayConfig {
    /// OAuth consumer key.
    pub consumer_key: String,
    /// OAuth consumer secret.
    pub consumer_secret: SecretString,
    /// Payee business shortcode (used as `BusinessShortCode` and `PartyB`).
    pub short_code: String,
    /// Shared-secret passkey the STK password is derived from.
    pub passkey: SecretString,
    /// Publicly reachable URL the gateway will invoke with the result.
    pub callback_url: String,
    /// Free-text description attached to every push request.
    pub transaction_desc: String,
}
