//! Shared fixture: the whole service wired over in-memory adapters.

#![allow(dead_code)]

use std::sync::Arc;

use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;

use pooled_inbox::adapters::http::{api_router, AppState, HttpSettings};
use pooled_inbox::adapters::memory::{
    InMemoryAccountStore, InMemoryMailRouteStore, InMemoryOrderRepository,
    InMemoryProcessedEventStore, RecordingMailer,
};
use pooled_inbox::adapters::stripe::MockPaymentProvider;
use pooled_inbox::adapters::ChangeFeedPoller;
use pooled_inbox::application::{
    AccountChangeProcessor, AccountProvisioner, CheckoutSettings, CreateOrderHandler,
    MailRouteSync, MailRouteSyncHandle, NotificationDispatcher, NotificationSettings,
    PaymentWebhookProcessor, UnsubscribeService,
};
use pooled_inbox::domain::account::MailDomain;
use pooled_inbox::domain::order::FlatPricing;
use pooled_inbox::domain::payment::WebhookVerifier;
use pooled_inbox::ports::MailRule;

pub const WEBHOOK_SECRET: &str = "whsec_integration_secret";
pub const DOMAIN: &str = "pool.example";

pub struct Service {
    pub orders: Arc<InMemoryOrderRepository>,
    pub accounts: Arc<InMemoryAccountStore>,
    pub routes: Arc<InMemoryMailRouteStore>,
    pub mailer: Arc<RecordingMailer>,
    pub payments: Arc<MockPaymentProvider>,
    pub route_handle: MailRouteSyncHandle,
    pub state: AppState,
    pub poller: ChangeFeedPoller,
}

pub fn rule() -> MailRule {
    MailRule::new("inbound", "pooled")
}

pub fn domain() -> MailDomain {
    MailDomain::new(DOMAIN)
}

impl Service {
    pub fn new() -> Self {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let accounts = Arc::new(InMemoryAccountStore::new());
        let routes = Arc::new(InMemoryMailRouteStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let payments = Arc::new(MockPaymentProvider::new());

        let (route_handle, _task) = MailRouteSync::spawn(routes.clone(), rule(), 5, 32);
        let provisioner = AccountProvisioner::new(orders.clone(), accounts.clone());

        let state = AppState {
            create_order: Arc::new(CreateOrderHandler::new(
                orders.clone(),
                payments.clone(),
                FlatPricing::new(500, "usd"),
                CheckoutSettings {
                    domain: domain(),
                    success_url: "https://pool.example/paid".into(),
                    cancel_url: "https://pool.example/cancelled".into(),
                },
            )),
            payment_webhook: Arc::new(PaymentWebhookProcessor::new(
                WebhookVerifier::new(SecretString::new(WEBHOOK_SECRET.to_string())),
                orders.clone(),
                provisioner,
            )),
            unsubscribe: Arc::new(UnsubscribeService::new(
                accounts.clone(),
                route_handle.clone(),
                domain(),
            )),
        };

        let notifications = Arc::new(NotificationDispatcher::new(
            mailer.clone(),
            Arc::new(InMemoryProcessedEventStore::new()),
            NotificationSettings {
                domain: domain(),
                sender: "noreply".into(),
                template: "Intro".into(),
            },
        ));
        let poller = ChangeFeedPoller::new(
            accounts.clone(),
            Arc::new(AccountChangeProcessor::new(
                route_handle.clone(),
                notifications,
                domain(),
            )),
        );

        Self {
            orders,
            accounts,
            routes,
            mailer,
            payments,
            route_handle,
            state,
            poller,
        }
    }

    pub fn router(&self) -> axum::Router {
        api_router(self.state.clone(), &HttpSettings::default())
    }

    pub async fn route_recipients(&self) -> Vec<String> {
        self.routes.recipients(&rule()).await
    }
}

/// A `checkout.session.*` event body for the given session.
pub fn checkout_event(event_type: &str, session_id: &str) -> String {
    serde_json::json!({
        "id": format!("evt_{}", session_id),
        "type": event_type,
        "created": chrono::Utc::now().timestamp(),
        "livemode": false,
        "data": {"object": {"id": session_id, "object": "checkout.session"}}
    })
    .to_string()
}

/// Signs `payload` the way the provider does.
pub fn sign(secret: &str, payload: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}
