//! Axum routes for payment endpoints.

use axum::{routing::post, Router};

use super::super::AppState;
use super::handlers::{create_payment, payment_webhook};

/// # Routes
/// - `POST /` - Create an order and checkout session
/// - `POST /webhook` - Provider webhook (signature verified, no auth)
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment))
        .route("/webhook", post(payment_webhook))
}
