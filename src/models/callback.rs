//! Wire types for the asynchronous result callback.
//!
//! The gateway delivers the outcome of a push as a nested JSON envelope
//! (`Body.stkCallback`). On success the callback carries a metadata
//! item list from which the paid amount, receipt number and payer phone
//! number are extracted by exact item name.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DarajaError, Result};

use super::{CheckoutRequestId, MerchantRequestId, PhoneNumber, ReceiptNumber};

/// Metadata item name carrying the paid amount.
const ITEM_AMOUNT: &str = "Amount";

/// Metadata item name carrying the receipt number.
const ITEM_RECEIPT: &str = "MpesaReceiptNumber";

/// Metadata item name carrying the payer phone number.
const ITEM_PHONE: &str = "PhoneNumber";

/// Top-level callback envelope as posted by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackEnvelope {
    /// Envelope body.
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

impl CallbackEnvelope {
    /// Parses a raw callback request body.
    ///
    /// A parse failure here means the request is truly malformed (not
    /// just missing metadata); an embedding HTTP handler may answer it
    /// with a 4xx instead of acknowledging.
    ///
    /// # Errors
    ///
    /// Returns [`DarajaError::Serialization`] if the body is not valid
    /// JSON in the expected envelope shape.
    #[inline]
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(DarajaError::from)
    }
}

/// Callback envelope body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackBody {
    /// The STK callback payload.
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

/// Outcome payload for one previously initiated push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StkCallback {
    /// Merchant request identifier from the original initiation.
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: MerchantRequestId,
    /// Checkout request identifier correlating to the pending record.
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: CheckoutRequestId,
    /// `0` means the payment succeeded; anything else is a failure.
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    /// Human-readable result description.
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
    /// Key/value metadata, present only on success.
    #[serde(rename = "CallbackMetadata", skip_serializing_if = "Option::is_none")]
    pub callback_metadata: Option<CallbackMetadata>,
}

impl StkCallback {
    /// Returns `true` if the gateway reports the payment as succeeded.
    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result_code == 0_i64
    }

    /// Looks up a metadata item value by its exact name.
    fn metadata_value(&self, name: &str) -> Option<&serde_json::Value> {
        self.callback_metadata
            .as_ref()?
            .item
            .iter()
            .find(|item| item.name == name)?
            .value
            .as_ref()
    }

    /// Extracts the paid amount from the metadata, if present.
    ///
    /// The gateway usually sends the amount as a JSON number but some
    /// deliveries quote it; both are accepted.
    #[inline]
    #[must_use]
    pub fn amount(&self) -> Option<Decimal> {
        let value = self.metadata_value(ITEM_AMOUNT)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Extracts the receipt number from the metadata, if present.
    #[inline]
    #[must_use]
    pub fn receipt_number(&self) -> Option<ReceiptNumber> {
        let value = self.metadata_value(ITEM_RECEIPT)?;
        value.as_str().map(ReceiptNumber::from)
    }

    /// Extracts and validates the payer phone number, if present.
    ///
    /// The number arrives as a JSON number in the documented shape; a
    /// string form is accepted as well. Invalid numbers yield `None`.
    #[inline]
    #[must_use]
    pub fn phone_number(&self) -> Option<PhoneNumber> {
        let value = self.metadata_value(ITEM_PHONE)?;
        let raw = match value.as_str() {
            Some(s) => s.to_owned(),
            None => value.as_u64()?.to_string(),
        };
        PhoneNumber::new(raw).ok()
    }
}

/// Metadata list attached to successful callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackMetadata {
    /// The key/value items.
    #[serde(rename = "Item")]
    pub item: Vec<MetadataItem>,
}

/// One key/value metadata entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataItem {
    /// Item name, matched exactly during extraction.
    #[serde(rename = "Name")]
    pub name: String,
    /// Item value; the gateway omits it for some items.
    #[serde(rename = "Value", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// Minimal acknowledgment body returned to the gateway.
///
/// The gateway does not read business data from the response; it only
/// needs a 2xx status to stop redelivering. This body is returned for
/// every reconciliation outcome, including anomalies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAck {
    /// Always `0`.
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    /// Short acknowledgment text.
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl CallbackAck {
    /// The standard acceptance acknowledgment.
    #[inline]
    #[must_use]
    pub fn accepted() -> Self {
        Self {
            result_code: 0_i64,
            result_desc: "Accepted".to_owned(),
        }
    }
}
