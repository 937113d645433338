//! Payment endpoints: order creation and provider webhooks.

mod dto;
mod handlers;
mod routes;

pub use dto::{CreatePaymentRequest, CreatePaymentResponse};
pub use handlers::SIGNATURE_HEADER;
pub use routes::payment_routes;
