//! HTTP handlers for payment endpoints.

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use super::super::error::ApiError;
use super::super::AppState;
use super::dto::{CreatePaymentRequest, CreatePaymentResponse};

/// Header carrying the provider's webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// POST /payments - Validate the order and open a checkout session
pub async fn create_payment(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::bad_request("VALIDATION_FAILED", e.body_text()))?;

    let result = state.create_order.handle(request.into()).await?;

    Ok(Json(CreatePaymentResponse::from(result)))
}

/// POST /payments/webhook - Settle an order from a signed provider event
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Webhook without signature header rejected");
        return StatusCode::BAD_REQUEST;
    };

    state.payment_webhook.handle_webhook(&body, signature).await
}
