//! Order-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | ValidationFailed | 400 |
//! | PaymentProvider | 502 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors raised while placing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// User input was rejected.
    ValidationFailed { field: String, message: String },

    /// The payment provider refused or failed to open a checkout session.
    PaymentProvider(String),

    /// Storage failed.
    Infrastructure(String),
}

impl OrderError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        OrderError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn payment_provider(message: impl Into<String>) -> Self {
        OrderError::PaymentProvider(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        OrderError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            OrderError::PaymentProvider(_) => ErrorCode::PaymentProviderError,
            OrderError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn message(&self) -> String {
        match self {
            OrderError::ValidationFailed { message, .. } => message.clone(),
            OrderError::PaymentProvider(m) => format!("Payment provider error: {}", m),
            OrderError::Infrastructure(m) => format!("Internal error: {}", m),
        }
    }
}

impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for OrderError {}

impl From<ValidationError> for OrderError {
    fn from(err: ValidationError) -> Self {
        OrderError::validation(err.field(), err.to_string())
    }
}

impl From<DomainError> for OrderError {
    fn from(err: DomainError) -> Self {
        OrderError::Infrastructure(err.to_string())
    }
}
