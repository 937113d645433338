//! HTTP adapter - the public REST surface.
//!
//! - `POST /payments` - place an order, returns the checkout reference
//! - `POST /payments/webhook` - payment provider notifications
//! - `POST /unsubscribe/:account_id/:token` - recipient self-removal

mod error;
pub mod payments;
mod router;
pub mod unsubscribe;

pub use error::{ApiError, ErrorResponse};
pub use router::{api_router, AppState, HttpSettings};
