//! Data models for the Daraja STK push flow.
//!
//! This module contains the locally persisted domain records
//! ([`PendingPayment`], [`Payer`]), newtype ID wrappers, and the wire
//! types matching the gateway's JSON exactly.

mod callback;
mod ids;
mod payer;
mod payment;
mod phone;
mod stk;

pub use callback::{
    CallbackAck, CallbackBody, CallbackEnvelope, CallbackMetadata, MetadataItem, StkCallback,
};
pub use ids::{CheckoutRequestId, MerchantRequestId, PayerId, ReceiptNumber};
pub use payer::Payer;
pub use payment::{PaymentStatus, PendingPayment};
pub use phone::PhoneNumber;
pub use stk::{GatewayErrorBody, StkPushRequest, StkPushResponse, TokenResponse};
