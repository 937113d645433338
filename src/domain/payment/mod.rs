//! Payment webhook domain - signature verification and typed checkout events.

mod errors;
mod event;
mod verifier;

pub use errors::WebhookError;
pub use event::{CheckoutOutcome, PaymentEvent, PaymentStatus, StripeEvent, StripeEventData};
pub use verifier::{SignatureHeader, WebhookVerifier};

#[cfg(test)]
pub(crate) use verifier::sign_for_test;
