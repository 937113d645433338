//! Application router with the shared middleware stack.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::application::{CreateOrderHandler, PaymentWebhookProcessor, UnsubscribeService};

use super::payments::payment_routes;
use super::unsubscribe::unsubscribe_routes;

/// Shared state handed to every handler. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub create_order: Arc<CreateOrderHandler>,
    pub payment_webhook: Arc<PaymentWebhookProcessor>,
    pub unsubscribe: Arc<UnsubscribeService>,
}

/// Middleware settings.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    /// Empty means no cross-origin access.
    pub cors_origins: Vec<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Builds the full router.
///
/// # Routes
/// - `POST /payments`
/// - `POST /payments/webhook`
/// - `POST /unsubscribe/:account_id/:token`
pub fn api_router(state: AppState, settings: &HttpSettings) -> Router {
    Router::new()
        .nest("/payments", payment_routes())
        .nest("/unsubscribe", unsubscribe_routes())
        .with_state(state)
        .layer(TimeoutLayer::new(settings.request_timeout))
        .layer(cors_layer(&settings.cors_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
