//! Request and response bodies for payment endpoints.

use serde::{Deserialize, Serialize};

use crate::application::{CreateOrderCommand, CreateOrderResult};

/// `POST /payments` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    #[serde(default)]
    pub recipients: Vec<String>,
    pub weeks: i64,
}

impl From<CreatePaymentRequest> for CreateOrderCommand {
    fn from(req: CreatePaymentRequest) -> Self {
        Self {
            recipients: req.recipients,
            weeks: req.weeks,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub checkout_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

impl From<CreateOrderResult> for CreatePaymentResponse {
    fn from(result: CreateOrderResult) -> Self {
        Self {
            checkout_reference: result.checkout_reference,
            checkout_url: result.checkout_url,
        }
    }
}
