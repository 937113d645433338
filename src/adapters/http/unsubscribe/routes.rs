//! Axum routes for unsubscribe links.

use axum::{routing::post, Router};

use super::super::AppState;
use super::handlers::unsubscribe;

/// # Routes
/// - `POST /:account_id/:token` - Remove one recipient
pub fn unsubscribe_routes() -> Router<AppState> {
    Router::new().route("/:account_id/:token", post(unsubscribe))
}
