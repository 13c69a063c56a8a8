//! Pending payment record and its lifecycle status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CheckoutRequestId, MerchantRequestId, PhoneNumber, ReceiptNumber};

/// Lifecycle status of a push-payment record.
///
/// A record is created as [`PaymentStatus::Pending`] and transitions to
/// [`PaymentStatus::Confirmed`] or [`PaymentStatus::Failed`] exactly
/// once, after which it is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Push prompt sent; awaiting the gateway callback.
    Pending,
    /// Payment confirmed by the gateway; balance has been reconciled.
    Confirmed,
    /// Payment denied or cancelled; no balance mutation occurred.
    Failed,
}

impl PaymentStatus {
    /// Returns `true` once the record has settled and become immutable.
    #[inline]
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }
}

impl core::fmt::Display for PaymentStatus {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match *self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Locally persisted record tracking one push-payment request.
///
/// Created when the gateway accepts an initiation, mutated exactly once
/// by callback reconciliation, and never deleted: settled records form
/// the audit trail, with the raw callback payload kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPayment {
    /// Unique gateway-issued correlation key.
    pub checkout_request_id: CheckoutRequestId,
    /// Gateway-issued merchant request identifier.
    pub merchant_request_id: MerchantRequestId,
    /// Payer phone number the prompt was sent to.
    pub phone: PhoneNumber,
    /// Requested amount in the gateway's currency unit.
    pub amount: Decimal,
    /// Current lifecycle status.
    pub status: PaymentStatus,
    /// Whether the confirmed amount has been credited to a payer.
    ///
    /// The settlement transition and the balance credit are separate
    /// store writes; this flag makes the credit idempotent and lets a
    /// redelivered callback resume a credit that failed after the
    /// record confirmed.
    #[serde(default)]
    pub credited: bool,
    /// Receipt number, present once confirmed.
    pub receipt: Option<ReceiptNumber>,
    /// Raw callback payload retained for audit, present once settled.
    pub raw_callback: Option<serde_json::Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl PendingPayment {
    /// Creates a fresh `pending` record for a just-accepted initiation.
    #[inline]
    #[must_use]
    pub fn new(
        checkout_request_id: CheckoutRequestId,
        merchant_request_id: MerchantRequestId,
        phone: PhoneNumber,
        amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            checkout_request_id,
            merchant_request_id,
            phone,
            amount,
            status: PaymentStatus::Pending,
            credited: false,
            receipt: None,
            raw_callback: None,
            created_at: now,
            updated_at: now,
        }
    }
}
