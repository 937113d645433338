//! API error type shared by the HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountError;
use crate::domain::order::OrderError;

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Error code for programmatic handling.
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Converts application errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(code, message),
        }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        let status = match &err {
            OrderError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            OrderError::PaymentProvider(_) => StatusCode::BAD_GATEWAY,
            OrderError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code().to_string(), err.message())
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        // Unknown account and unknown token look the same to the caller.
        let status = match &err {
            AccountError::NotFound(_) | AccountError::RecipientNotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            AccountError::ConcurrentModification(_) => StatusCode::CONFLICT,
            AccountError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code().to_string(), err.message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = %self.body.code, error = %self.body.error, "Request failed");
        }
        (self.status, Json(self.body)).into_response()
    }
}
