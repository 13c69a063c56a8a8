//! Pluggable persistence for payments and payer balances.
//!
//! The settlement methods are where the one correctness-critical
//! invariant of the whole flow lives: the `pending -> confirmed` and
//! `pending -> failed` transitions must be applied as a single
//! conditional update, so two racing deliveries of the same callback
//! cannot both observe `pending` and both apply a state change.

mod memory;

pub use memory::InMemoryStore;

use core::future::Future;

use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{
    CheckoutRequestId, Payer, PayerId, PaymentStatus, PendingPayment, PhoneNumber, ReceiptNumber,
};

/// Outcome of a conditional settlement attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// The record was `pending` and transitioned exactly once; the
    /// updated record is returned.
    Applied(PendingPayment),
    /// The record had already settled (duplicate delivery); nothing was
    /// changed. Carries the record as it settled, so the caller can see
    /// whether a confirmed payment still awaits its balance credit.
    AlreadySettled(PendingPayment),
    /// No record matches the checkout request identifier.
    NotFound,
}

/// Outcome of an idempotent balance-credit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credit {
    /// The balance was credited and the payment marked credited, as one
    /// atomic write.
    Applied,
    /// The payment had already been credited; nothing was changed.
    AlreadyApplied,
    /// No payer matches the given identifier; the payment stays
    /// uncredited so a later attempt can succeed.
    PayerMissing,
    /// No payment matches the checkout request identifier.
    PaymentMissing,
}

/// Async storage backend for payments and payer balances.
///
/// All methods take `&self`; implementations use interior mutability
/// for thread-safe mutation. Implementations must make each settlement
/// call atomic: the `pending` check and the status write happen as one
/// step (a conditional update), never as a read followed by a separate
/// write.
pub trait PaymentStore: core::fmt::Debug + Send + Sync {
    /// Persists a newly initiated payment in `pending` status.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DarajaError::DuplicatePayment`] if a
    /// record already exists for the checkout request identifier, or a
    /// backend error if the write fails.
    fn insert_payment(&self, payment: PendingPayment) -> impl Future<Output = Result<()>> + Send;

    /// Looks up a payment by checkout request identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to read.
    fn payment(
        &self,
        id: &CheckoutRequestId,
    ) -> impl Future<Output = Result<Option<PendingPayment>>> + Send;

    /// Returns all payments currently in the given status.
    ///
    /// Settled records are never deleted, so this doubles as the audit
    /// listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to read.
    fn payments_by_status(
        &self,
        status: PaymentStatus,
    ) -> impl Future<Output = Result<Vec<PendingPayment>>> + Send;

    /// Conditionally transitions a record `pending -> confirmed`,
    /// recording the receipt number and the raw callback payload.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend fails; correlation misses
    /// and duplicate deliveries are reported through [`Settlement`].
    fn confirm_payment(
        &self,
        id: &CheckoutRequestId,
        receipt: ReceiptNumber,
        raw: serde_json::Value,
    ) -> impl Future<Output = Result<Settlement>> + Send;

    /// Conditionally transitions a record `pending -> failed`,
    /// recording the raw callback payload.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend fails; correlation misses
    /// and duplicate deliveries are reported through [`Settlement`].
    fn fail_payment(
        &self,
        id: &CheckoutRequestId,
        raw: serde_json::Value,
    ) -> impl Future<Output = Result<Settlement>> + Send;

    /// Inserts or replaces a payer (matched by ID).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to write.
    fn upsert_payer(&self, payer: Payer) -> impl Future<Output = Result<()>> + Send;

    /// Looks up a payer by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to read.
    fn payer(&self, id: PayerId) -> impl Future<Output = Result<Option<Payer>>> + Send;

    /// Resolves a payer by registered phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to read.
    fn payer_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> impl Future<Output = Result<Option<Payer>>> + Send;

    /// Credits `amount` to the payer's balance for the given payment,
    /// at most once per payment.
    ///
    /// The balance increment and the payment's `credited` flag must be
    /// written as one atomic operation, so racing or redelivered
    /// callbacks cannot double-credit, and a credit that failed after
    /// the settlement transition can be resumed on the next delivery.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend fails; missing payers and
    /// already-credited payments are reported through [`Credit`].
    fn credit_confirmed(
        &self,
        id: &CheckoutRequestId,
        payer: PayerId,
        amount: Decimal,
    ) -> impl Future<Output = Result<Credit>> + Send;
}
