//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for hosted checkout. Webhook
//! verification lives in the domain (`domain::payment`) because it needs no I/O.
//!
//! # Security
//!
//! The API key is held as `secrecy::SecretString` and never logged.

mod mock_payment_provider;
mod stripe_adapter;

pub use mock_payment_provider::MockPaymentProvider;
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
