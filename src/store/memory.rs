//! In-memory store backend.
//!
//! Provides [`InMemoryStore`], a thread-safe in-memory implementation
//! of [`super::PaymentStore`]. All state sits behind a single mutex, so
//! the conditional settlement update is trivially atomic: the status
//! check and the write happen under one lock acquisition.

use core::future::{self, Future};
use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::{DarajaError, Result};
use crate::models::{
    CheckoutRequestId, Payer, PayerId, PaymentStatus, PendingPayment, PhoneNumber, ReceiptNumber,
};

use super::{Credit, Settlement};

/// Thread-safe in-memory store.
///
/// Suited to tests and single-process deployments; the audit trail does
/// not survive a restart. Settled records are kept forever, matching
/// the never-delete lifecycle of [`PendingPayment`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    /// All state behind a single mutex for thread-safe interior mutability.
    inner: Mutex<Inner>,
}

/// Inner mutable state.
#[derive(Debug, Default)]
struct Inner {
    /// Payments keyed by checkout request identifier.
    payments: HashMap<CheckoutRequestId, PendingPayment>,
    /// Payers keyed by ID.
    payers: HashMap<PayerId, Payer>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the inner lock and applies an infallible closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> Result<R> {
        self.try_with_lock(|inner| Ok(f(inner)))
    }

    /// Acquires the inner lock and applies a fallible closure.
    fn try_with_lock<R>(&self, f: impl FnOnce(&mut Inner) -> Result<R>) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        f(&mut inner)
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> DarajaError {
    DarajaError::Store(err.to_string().into())
}

/// Applies a settlement mutation if and only if the record is `pending`.
///
/// This is the conditional-update guard: status check and mutation run
/// under the caller's lock as one step.
fn settle(
    inner: &mut Inner,
    id: &CheckoutRequestId,
    apply: impl FnOnce(&mut PendingPayment),
) -> Settlement {
    match inner.payments.get_mut(id) {
        None => Settlement::NotFound,
        Some(payment) if payment.status.is_settled() => {
            Settlement::AlreadySettled(payment.clone())
        }
        Some(payment) => {
            apply(payment);
            payment.updated_at = Utc::now();
            Settlement::Applied(payment.clone())
        }
    }
}

impl super::PaymentStore for InMemoryStore {
    #[inline]
    fn insert_payment(&self, payment: PendingPayment) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.try_with_lock(|inner| {
            if inner.payments.contains_key(&payment.checkout_request_id) {
                return Err(DarajaError::DuplicatePayment(
                    payment.checkout_request_id.clone(),
                ));
            }
            let _old = inner
                .payments
                .insert(payment.checkout_request_id.clone(), payment);
            Ok(())
        }))
    }

    #[inline]
    fn payment(
        &self,
        id: &CheckoutRequestId,
    ) -> impl Future<Output = Result<Option<PendingPayment>>> + Send {
        future::ready(self.with_lock(|inner| inner.payments.get(id).cloned()))
    }

    #[inline]
    fn payments_by_status(
        &self,
        status: PaymentStatus,
    ) -> impl Future<Output = Result<Vec<PendingPayment>>> + Send {
        future::ready(self.with_lock(|inner| {
            inner
                .payments
                .values()
                .filter(|payment| payment.status == status)
                .cloned()
                .collect()
        }))
    }

    #[inline]
    fn confirm_payment(
        &self,
        id: &CheckoutRequestId,
        receipt: ReceiptNumber,
        raw: serde_json::Value,
    ) -> impl Future<Output = Result<Settlement>> + Send {
        future::ready(self.with_lock(|inner| {
            settle(inner, id, |payment| {
                payment.status = PaymentStatus::Confirmed;
                payment.receipt = Some(receipt);
                payment.raw_callback = Some(raw);
            })
        }))
    }

    #[inline]
    fn fail_payment(
        &self,
        id: &CheckoutRequestId,
        raw: serde_json::Value,
    ) -> impl Future<Output = Result<Settlement>> + Send {
        future::ready(self.with_lock(|inner| {
            settle(inner, id, |payment| {
                payment.status = PaymentStatus::Failed;
                payment.raw_callback = Some(raw);
            })
        }))
    }

    #[inline]
    fn upsert_payer(&self, payer: Payer) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.with_lock(|inner| {
            let _old = inner.payers.insert(payer.id, payer);
        }))
    }

    #[inline]
    fn payer(&self, id: PayerId) -> impl Future<Output = Result<Option<Payer>>> + Send {
        future::ready(self.with_lock(|inner| inner.payers.get(&id).cloned()))
    }

    #[inline]
    fn payer_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> impl Future<Output = Result<Option<Payer>>> + Send {
        future::ready(self.with_lock(|inner| {
            inner
                .payers
                .values()
                .find(|payer| payer.phone == *phone)
                .cloned()
        }))
    }

    #[inline]
    fn credit_confirmed(
        &self,
        id: &CheckoutRequestId,
        payer: PayerId,
        amount: Decimal,
    ) -> impl Future<Output = Result<Credit>> + Send {
        future::ready(self.with_lock(|inner| {
            let Some(payment) = inner.payments.get_mut(id) else {
                return Credit::PaymentMissing;
            };
            if payment.credited {
                return Credit::AlreadyApplied;
            }
            let Some(account) = inner.payers.get_mut(&payer) else {
                return Credit::PayerMissing;
            };
            account.balance += amount;
            payment.credited = true;
            payment.updated_at = Utc::now();
            Credit::Applied
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MerchantRequestId;
    use crate::store::PaymentStore;
    use uuid::Uuid;

    fn phone() -> PhoneNumber {
        PhoneNumber::new("254712345678").unwrap()
    }

    fn unique_payment() -> PendingPayment {
        PendingPayment::new(
            CheckoutRequestId::from(format!("ws_CO_{}", Uuid::new_v4()).as_str()),
            MerchantRequestId::from("mr-1"),
            phone(),
            Decimal::from(500_u32),
        )
    }

    fn raw() -> serde_json::Value {
        serde_json::json!({"ResultCode": 0})
    }

    #[tokio::test]
    async fn insert_and_read_payment() {
        let store = InMemoryStore::new();
        let payment = unique_payment();
        let id = payment.checkout_request_id.clone();
        store.insert_payment(payment).await.unwrap();

        let found = store.payment(&id).await.unwrap().unwrap();
        assert_eq!(found.status, PaymentStatus::Pending);
        assert!(
            store
                .payment(&CheckoutRequestId::from("missing"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = InMemoryStore::new();
        let payment = unique_payment();
        store.insert_payment(payment.clone()).await.unwrap();

        let err = store.insert_payment(payment).await.unwrap_err();
        assert!(matches!(err, DarajaError::DuplicatePayment(_)));
    }

    #[tokio::test]
    async fn confirm_applies_once() {
        let store = InMemoryStore::new();
        let payment = unique_payment();
        let id = payment.checkout_request_id.clone();
        store.insert_payment(payment).await.unwrap();

        let first = store
            .confirm_payment(&id, ReceiptNumber::from("QAX123"), raw())
            .await
            .unwrap();
        let Settlement::Applied(updated) = first else {
            unreachable!("first settlement must apply");
        };
        assert_eq!(updated.status, PaymentStatus::Confirmed);
        assert_eq!(updated.receipt, Some(ReceiptNumber::from("QAX123")));
        assert!(updated.raw_callback.is_some());

        let second = store
            .confirm_payment(&id, ReceiptNumber::from("QAX123"), raw())
            .await
            .unwrap();
        assert!(
            matches!(second, Settlement::AlreadySettled(p) if p.status == PaymentStatus::Confirmed)
        );
    }

    #[tokio::test]
    async fn fail_then_confirm_is_rejected() {
        let store = InMemoryStore::new();
        let payment = unique_payment();
        let id = payment.checkout_request_id.clone();
        store.insert_payment(payment).await.unwrap();

        let failed = store.fail_payment(&id, raw()).await.unwrap();
        assert!(matches!(failed, Settlement::Applied(_)));

        let after = store
            .confirm_payment(&id, ReceiptNumber::from("QAX999"), raw())
            .await
            .unwrap();
        assert!(
            matches!(after, Settlement::AlreadySettled(p) if p.status == PaymentStatus::Failed)
        );

        let record = store.payment(&id).await.unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Failed);
        assert!(record.receipt.is_none());
    }

    #[tokio::test]
    async fn settle_unknown_checkout_reports_not_found() {
        let store = InMemoryStore::new();
        let outcome = store
            .confirm_payment(
                &CheckoutRequestId::from("ws_CO_unknown"),
                ReceiptNumber::from("QAX123"),
                raw(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, Settlement::NotFound);
    }

    #[tokio::test]
    async fn payments_by_status_filters() {
        let store = InMemoryStore::new();
        let confirmed = unique_payment();
        let confirmed_id = confirmed.checkout_request_id.clone();
        store.insert_payment(confirmed).await.unwrap();
        store.insert_payment(unique_payment()).await.unwrap();
        let _settlement = store
            .confirm_payment(&confirmed_id, ReceiptNumber::from("QAX123"), raw())
            .await
            .unwrap();

        let pending = store
            .payments_by_status(PaymentStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        let settled = store
            .payments_by_status(PaymentStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled.first().map(|p| p.checkout_request_id.clone()), Some(confirmed_id));
    }

    #[tokio::test]
    async fn payer_lookup_by_phone() {
        let store = InMemoryStore::new();
        let payer = Payer::new(PayerId::new(1_i64), phone(), "Jane Student".to_owned());
        store.upsert_payer(payer).await.unwrap();

        let found = store.payer_by_phone(&phone()).await.unwrap().unwrap();
        assert_eq!(found.id, PayerId::new(1_i64));
    }

    #[tokio::test]
    async fn credit_applies_once_per_payment() {
        let store = InMemoryStore::new();
        let payment = unique_payment();
        let id = payment.checkout_request_id.clone();
        store.insert_payment(payment).await.unwrap();
        store
            .upsert_payer(Payer::new(PayerId::new(1_i64), phone(), "Jane Student".to_owned()))
            .await
            .unwrap();
        let _settlement = store
            .confirm_payment(&id, ReceiptNumber::from("QAX123"), raw())
            .await
            .unwrap();

        let first = store
            .credit_confirmed(&id, PayerId::new(1_i64), Decimal::from(500_u32))
            .await
            .unwrap();
        assert_eq!(first, Credit::Applied);
        assert!(store.payment(&id).await.unwrap().unwrap().credited);

        let second = store
            .credit_confirmed(&id, PayerId::new(1_i64), Decimal::from(500_u32))
            .await
            .unwrap();
        assert_eq!(second, Credit::AlreadyApplied);

        let balance = store.payer(PayerId::new(1_i64)).await.unwrap().unwrap().balance;
        assert_eq!(balance, Decimal::from(500_u32));
    }

    #[tokio::test]
    async fn credit_with_unknown_payer_leaves_payment_uncredited() {
        let store = InMemoryStore::new();
        let payment = unique_payment();
        let id = payment.checkout_request_id.clone();
        store.insert_payment(payment).await.unwrap();

        let outcome = store
            .credit_confirmed(&id, PayerId::new(99_i64), Decimal::from(500_u32))
            .await
            .unwrap();
        assert_eq!(outcome, Credit::PayerMissing);
        assert!(!store.payment(&id).await.unwrap().unwrap().credited);
    }

    #[tokio::test]
    async fn credit_unknown_payment_is_reported() {
        let store = InMemoryStore::new();
        let outcome = store
            .credit_confirmed(
                &CheckoutRequestId::from("ws_CO_unknown"),
                PayerId::new(1_i64),
                Decimal::from(500_u32),
            )
            .await
            .unwrap();
        assert_eq!(outcome, Credit::PaymentMissing);
    }

    #[tokio::test]
    async fn upsert_payer_replaces_by_id() {
        let store = InMemoryStore::new();
        store
            .upsert_payer(Payer::new(PayerId::new(1_i64), phone(), "Old".to_owned()))
            .await
            .unwrap();
        store
            .upsert_payer(Payer::new(PayerId::new(1_i64), phone(), "New".to_owned()))
            .await
            .unwrap();
        let payer = store.payer(PayerId::new(1_i64)).await.unwrap().unwrap();
        assert_eq!(payer.name, "New");
    }
}
