//! Webhook error types for payment webhook handling.
//!
//! Status codes decide the provider's retry behaviour: 4xx is final,
//! 5xx is redelivered.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the accepted window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse webhook payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Event type outside the checkout session family.
    #[error("Unsupported event: {0}")]
    UnsupportedEvent(String),

    /// Test-mode event received while live mode is required.
    #[error("Test mode event rejected")]
    TestModeRejected,

    /// The checkout session has no order. Orders are written before the
    /// session is handed to the buyer, so this is a consistency fault.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Storage operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_) | WebhookError::OrderNotFound(_)
        )
    }

    /// True when the request was rejected before any lookup.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    /// Maps the error to an HTTP status code. Retryable errors are 5xx so
    /// the provider redelivers them.
    pub fn status_code(&self) -> StatusCode {
        if self.is_retryable() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::BAD_REQUEST
        }
    }
}
