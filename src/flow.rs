//! High-level push-payment flow: initiation and callback reconciliation.
//!
//! Combines the low-level HTTP client with a [`PaymentStore`] backend.
//! Initiation is synchronous from the caller's point of view ("push
//! sent" or an error); the eventual confirm/fail outcome arrives later
//! as a gateway callback and is reconciled by
//! [`PaymentFlow::handle_callback`] exactly once per payment.

use rust_decimal::Decimal;

use crate::client::DarajaClient;
use crate::error::{DarajaError, Result};
use crate::models::{
    CallbackAck, CallbackEnvelope, CheckoutRequestId, MerchantRequestId, Payer, PayerId,
    PaymentStatus, PendingPayment, PhoneNumber, ReceiptNumber, StkCallback,
};
use crate::store::{Credit, PaymentStore, Settlement};

/// Identifiers handed back to the initiating caller once the gateway
/// accepts a push request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReceipt {
    /// Correlation key for the later callback.
    pub checkout_request_id: CheckoutRequestId,
    /// Gateway-issued merchant request identifier.
    pub merchant_request_id: MerchantRequestId,
    /// Message suitable for showing to the payer.
    pub customer_message: String,
}

/// Result of reconciling one callback delivery.
///
/// Every variant is an acknowledged outcome: an embedding HTTP handler
/// should answer the gateway with 200 and [`CallbackAck::accepted`] for
/// all of them, so the gateway stops redelivering. Only an `Err` from
/// [`PaymentFlow::handle_callback`] (a store failure) warrants a
/// non-2xx response, deliberately leaving redelivery to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The record transitioned `pending -> confirmed` and the payer's
    /// balance was credited with the callback amount.
    Confirmed {
        /// The settled payment's correlation key.
        checkout_request_id: CheckoutRequestId,
        /// Gateway receipt number.
        receipt: ReceiptNumber,
        /// Amount credited.
        amount: Decimal,
    },
    /// The record transitioned `pending -> confirmed` but no payer
    /// matches the callback phone number. The payment was genuinely
    /// received, so the record stays confirmed; the missing credit is a
    /// reconciliation gap for manual follow-up.
    ConfirmedUnresolvedPayer {
        /// The settled payment's correlation key.
        checkout_request_id: CheckoutRequestId,
        /// Phone number from the callback metadata, if usable.
        phone: Option<PhoneNumber>,
        /// Amount that was not credited.
        amount: Decimal,
    },
    /// The record transitioned `pending -> failed`. No balance change.
    Failed {
        /// The settled payment's correlation key.
        checkout_request_id: CheckoutRequestId,
        /// Gateway result code explaining the failure.
        result_code: i64,
    },
    /// The record had already settled: a duplicate delivery. Nothing
    /// was changed and no balance was credited a second time.
    Duplicate {
        /// The correlation key of the already-settled record.
        checkout_request_id: CheckoutRequestId,
        /// Status the record settled into earlier.
        status: PaymentStatus,
    },
    /// No pending record matches the checkout request identifier. The
    /// anomaly is logged and acknowledged; nothing is mutated.
    UnknownCheckout {
        /// The unmatched correlation key.
        checkout_request_id: CheckoutRequestId,
    },
    /// A success callback arrived without a required metadata item.
    /// The matching record is left untouched for manual follow-up;
    /// crediting on guesswork is worse than not crediting.
    MissingMetadata {
        /// The correlation key of the untouched record.
        checkout_request_id: CheckoutRequestId,
        /// Name of the missing metadata item.
        missing: &'static str,
    },
}

impl ReconcileOutcome {
    /// The acknowledgment body to return to the gateway.
    #[inline]
    #[must_use]
    pub fn ack(&self) -> CallbackAck {
        CallbackAck::accepted()
    }

    /// HTTP status an embedding handler should return to the gateway.
    ///
    /// Always 200: a non-2xx would make the gateway redeliver, which is
    /// only wanted for persistence failures (surfaced as `Err`, not as
    /// an outcome).
    #[inline]
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        200
    }
}

/// High-level payment flow over a client and a store.
///
/// Use one instance per gateway configuration; it is cheap to share
/// behind an `Arc` since all methods take `&self`.
#[derive(Debug)]
pub struct PaymentFlow<S> {
    /// Gateway HTTP client.
    client: DarajaClient,
    /// Persistence backend.
    store: S,
}

impl<S: PaymentStore> PaymentFlow<S> {
    /// Creates a flow from a configured client and a store backend.
    #[inline]
    #[must_use]
    pub const fn new(client: DarajaClient, store: S) -> Self {
        Self { client, store }
    }

    /// Returns a reference to the underlying store.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Initiates a push-payment prompt on the payer's phone.
    ///
    /// Validation happens before any network traffic; a bad phone
    /// number or amount never reaches the gateway. On acceptance a
    /// `pending` record keyed by the checkout request identifier is
    /// persisted before the caller is told the prompt was sent.
    ///
    /// # Errors
    ///
    /// Returns [`DarajaError::InvalidPhoneNumber`] or
    /// [`DarajaError::InvalidAmount`] for rejected input,
    /// [`DarajaError::Auth`] / [`DarajaError::Gateway`] for gateway
    /// refusals (no record is created in those cases), and a store
    /// error if persisting the accepted record fails.
    #[inline]
    #[tracing::instrument(skip_all, fields(amount = %amount))]
    pub async fn initiate_push(
        &self,
        phone: &str,
        amount: Decimal,
        reference: &str,
    ) -> Result<PushReceipt> {
        let payer_phone = PhoneNumber::new(phone)?;
        if amount <= Decimal::ZERO {
            return Err(DarajaError::InvalidAmount { value: amount });
        }

        let token = self.client.fetch_token().await?;
        let response = self
            .client
            .stk_push(&token, &payer_phone, amount, reference)
            .await?;

        let payment = PendingPayment::new(
            response.checkout_request_id.clone(),
            response.merchant_request_id.clone(),
            payer_phone,
            amount,
        );
        self.store.insert_payment(payment).await?;
        tracing::debug!(checkout = %response.checkout_request_id, "pending payment recorded");

        Ok(PushReceipt {
            checkout_request_id: response.checkout_request_id,
            merchant_request_id: response.merchant_request_id,
            customer_message: response.customer_message,
        })
    }

    /// Reconciles one asynchronous callback delivery.
    ///
    /// Correlation is strictly by checkout request identifier. The
    /// settlement itself is a conditional store update, so a replayed
    /// callback (or two racing deliveries) can settle a record and
    /// credit its payer at most once.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store fails; every reconciliation
    /// outcome, including anomalies, is an `Ok` value the caller should
    /// acknowledge to the gateway.
    #[inline]
    #[tracing::instrument(skip_all, fields(checkout = %envelope.body.stk_callback.checkout_request_id))]
    pub async fn handle_callback(&self, envelope: &CallbackEnvelope) -> Result<ReconcileOutcome> {
        let callback = &envelope.body.stk_callback;
        let raw = serde_json::to_value(envelope)?;
        if callback.is_success() {
            self.reconcile_success(callback, raw).await
        } else {
            self.reconcile_failure(callback, raw).await
        }
    }

    /// Parses a raw callback request body and reconciles it.
    ///
    /// Convenience for embedding HTTP handlers that receive the body as
    /// text.
    ///
    /// # Errors
    ///
    /// Returns [`DarajaError::Serialization`] for a truly malformed
    /// body (which a handler may answer with 4xx instead of
    /// acknowledging), or a store error from reconciliation.
    #[inline]
    pub async fn handle_callback_json(&self, body: &str) -> Result<ReconcileOutcome> {
        let envelope = CallbackEnvelope::from_json(body)?;
        self.handle_callback(&envelope).await
    }

    /// Success path: confirm the record, then credit the payer.
    ///
    /// A duplicate delivery of a confirmed record that never finished
    /// its credit (the credit write failed after the transition, the
    /// gateway retried on the resulting non-2xx) resumes the credit
    /// instead of reporting a benign replay.
    async fn reconcile_success(
        &self,
        callback: &StkCallback,
        raw: serde_json::Value,
    ) -> Result<ReconcileOutcome> {
        let checkout = callback.checkout_request_id.clone();
        let Some(receipt) = callback.receipt_number() else {
            return self.incomplete_success(checkout, "MpesaReceiptNumber").await;
        };
        let Some(amount) = callback.amount() else {
            return self.incomplete_success(checkout, "Amount").await;
        };

        match self
            .store
            .confirm_payment(&checkout, receipt.clone(), raw)
            .await?
        {
            Settlement::NotFound => {
                tracing::warn!(checkout = %checkout, "callback for unknown checkout request");
                Ok(ReconcileOutcome::UnknownCheckout {
                    checkout_request_id: checkout,
                })
            }
            Settlement::AlreadySettled(payment) => {
                if payment.status == PaymentStatus::Confirmed && !payment.credited {
                    tracing::warn!(checkout = %checkout, "redelivery resuming unfinished credit");
                    self.credit(callback, checkout, receipt, amount).await
                } else {
                    tracing::warn!(checkout = %checkout, status = %payment.status, "duplicate callback delivery");
                    Ok(ReconcileOutcome::Duplicate {
                        checkout_request_id: checkout,
                        status: payment.status,
                    })
                }
            }
            Settlement::Applied(payment) => {
                if amount != payment.amount {
                    tracing::warn!(
                        checkout = %checkout,
                        initiated = %payment.amount,
                        confirmed = %amount,
                        "callback amount differs from initiated amount"
                    );
                }
                self.credit(callback, checkout, receipt, amount).await
            }
        }
    }

    /// Classifies a success callback lacking a required metadata item.
    ///
    /// A correlation miss outranks the metadata gap: if no record
    /// matches the checkout request identifier the outcome is
    /// [`ReconcileOutcome::UnknownCheckout`], not a metadata anomaly on
    /// a record that does not exist.
    async fn incomplete_success(
        &self,
        checkout: CheckoutRequestId,
        missing: &'static str,
    ) -> Result<ReconcileOutcome> {
        if self.store.payment(&checkout).await?.is_none() {
            tracing::warn!(checkout = %checkout, "callback for unknown checkout request");
            return Ok(ReconcileOutcome::UnknownCheckout {
                checkout_request_id: checkout,
            });
        }
        tracing::warn!(checkout = %checkout, missing, "success callback missing metadata item");
        Ok(ReconcileOutcome::MissingMetadata {
            checkout_request_id: checkout,
            missing,
        })
    }

    /// Credits the payer resolved from the callback phone number.
    ///
    /// The credit itself is idempotent in the store (keyed by the
    /// payment's `credited` flag), so this is safe to call again on
    /// redelivery. A confirmed payment whose payer cannot be resolved
    /// stays confirmed and uncredited; the gap is logged and a later
    /// delivery can still complete the credit.
    async fn credit(
        &self,
        callback: &StkCallback,
        checkout: CheckoutRequestId,
        receipt: ReceiptNumber,
        amount: Decimal,
    ) -> Result<ReconcileOutcome> {
        let phone = callback.phone_number();
        let resolved = match phone.as_ref() {
            Some(number) => self.store.payer_by_phone(number).await?,
            None => None,
        };
        let Some(payer) = resolved else {
            tracing::warn!(checkout = %checkout, "confirmed payment with unresolved payer");
            return Ok(ReconcileOutcome::ConfirmedUnresolvedPayer {
                checkout_request_id: checkout,
                phone,
                amount,
            });
        };
        match self
            .store
            .credit_confirmed(&checkout, payer.id, amount)
            .await?
        {
            Credit::Applied => {
                tracing::debug!(checkout = %checkout, payer = %payer.id, amount = %amount, "balance credited");
                Ok(ReconcileOutcome::Confirmed {
                    checkout_request_id: checkout,
                    receipt,
                    amount,
                })
            }
            Credit::AlreadyApplied => {
                tracing::warn!(checkout = %checkout, "credit already applied, duplicate delivery");
                Ok(ReconcileOutcome::Duplicate {
                    checkout_request_id: checkout,
                    status: PaymentStatus::Confirmed,
                })
            }
            Credit::PayerMissing => {
                tracing::warn!(checkout = %checkout, payer = %payer.id, "payer vanished before credit");
                Ok(ReconcileOutcome::ConfirmedUnresolvedPayer {
                    checkout_request_id: checkout,
                    phone,
                    amount,
                })
            }
            Credit::PaymentMissing => {
                tracing::warn!(checkout = %checkout, "payment vanished before credit");
                Ok(ReconcileOutcome::UnknownCheckout {
                    checkout_request_id: checkout,
                })
            }
        }
    }

    /// Failure path: mark the record failed; never touch balances.
    async fn reconcile_failure(
        &self,
        callback: &StkCallback,
        raw: serde_json::Value,
    ) -> Result<ReconcileOutcome> {
        let checkout = callback.checkout_request_id.clone();
        match self.store.fail_payment(&checkout, raw).await? {
            Settlement::NotFound => {
                tracing::warn!(checkout = %checkout, "callback for unknown checkout request");
                Ok(ReconcileOutcome::UnknownCheckout {
                    checkout_request_id: checkout,
                })
            }
            Settlement::AlreadySettled(payment) => {
                tracing::warn!(checkout = %checkout, status = %payment.status, "duplicate callback delivery");
                Ok(ReconcileOutcome::Duplicate {
                    checkout_request_id: checkout,
                    status: payment.status,
                })
            }
            Settlement::Applied(_) => {
                tracing::debug!(
                    checkout = %checkout,
                    result_code = callback.result_code,
                    desc = %callback.result_desc,
                    "payment marked failed"
                );
                Ok(ReconcileOutcome::Failed {
                    checkout_request_id: checkout,
                    result_code: callback.result_code,
                })
            }
        }
    }

    /// Registers (or replaces) a payer account.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to write.
    #[inline]
    pub async fn register_payer(&self, payer: Payer) -> Result<()> {
        self.store.upsert_payer(payer).await
    }

    /// Looks up a payment record by its checkout request identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to read.
    #[inline]
    pub async fn payment(&self, id: &CheckoutRequestId) -> Result<Option<PendingPayment>> {
        self.store.payment(id).await
    }

    /// Returns the current balance of a payer, if the payer exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to read.
    #[inline]
    pub async fn payer_balance(&self, id: PayerId) -> Result<Option<Decimal>> {
        Ok(self.store.payer(id).await?.map(|payer| payer.balance))
    }

    /// Audit listing of payments in the given status.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to read.
    #[inline]
    pub async fn payments_by_status(&self, status: PaymentStatus) -> Result<Vec<PendingPayment>> {
        self.store.payments_by_status(status).await
    }
}
