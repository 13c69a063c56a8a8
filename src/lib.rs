//! Rust client library for the M-Pesa Daraja STK push API.
//!
//! This crate provides a typed client for initiating STK push payment
//! prompts through the [Daraja](https://developer.safaricom.co.ke/)
//! gateway and reconciling the asynchronous result callbacks against
//! locally persisted payment records.
//!
//! The pieces compose bottom-up:
//!
//! - [`client::DarajaClient`] speaks the token and push endpoints;
//! - [`store::PaymentStore`] persists payment records and payer
//!   balances, with [`store::InMemoryStore`] as the built-in backend;
//! - [`flow::PaymentFlow`] ties both together: synchronous initiation,
//!   then exactly-once settlement when the callback arrives.

pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod models;
pub mod store;
