//! PaymentWebhookProcessor - settles orders from payment provider webhooks.
//!
//! # Flow
//!
//! 1. Verify the signature; nothing is looked up before this passes.
//! 2. Decode into a typed checkout event (only `checkout.session.*`). A
//!    completed session that is still unpaid is acknowledged without change.
//! 3. Load the order; a missing order is a server error.
//! 4. Compare-and-set `Pending -> target`. A completed payment reserves the
//!    account id in the same write.
//! 5. For a success, store the account and mark the order provisioned.
//!
//! A crash between 4 and 5 leaves a succeeded, unprovisioned order. The next
//! delivery of the same webhook, or the reconciliation sweep, finishes it.

use std::sync::Arc;

use axum::http::StatusCode;

use crate::domain::foundation::{AccountId, OrderId, StateMachine, TransitionPlan};
use crate::domain::order::{Order, OrderState};
use crate::domain::payment::{PaymentEvent, WebhookError, WebhookVerifier};
use crate::ports::OrderRepository;

use super::provision_account::AccountProvisioner;

/// A lost compare-and-set is followed by one re-read; the order is terminal by then.
const MAX_SETTLE_ATTEMPTS: usize = 2;

/// What a webhook delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Order moved to `Cancelled` or `Failed`.
    Settled { order_id: OrderId, state: OrderState },
    /// Order is `Succeeded` and its account is stored.
    AccountProvisioned {
        order_id: OrderId,
        account_id: AccountId,
    },
    /// Session completed with a delayed payment still outstanding.
    AwaitingPayment { order_id: OrderId },
    /// Redelivery of a webhook that was already fully applied.
    AlreadyProcessed { order_id: OrderId },
    /// Order had already settled differently; acknowledged without change.
    ConflictingOutcome {
        order_id: OrderId,
        current: OrderState,
        requested: OrderState,
    },
}

pub struct PaymentWebhookProcessor {
    verifier: WebhookVerifier,
    orders: Arc<dyn OrderRepository>,
    provisioner: AccountProvisioner,
    require_livemode: bool,
}

impl PaymentWebhookProcessor {
    pub fn new(
        verifier: WebhookVerifier,
        orders: Arc<dyn OrderRepository>,
        provisioner: AccountProvisioner,
    ) -> Self {
        Self {
            verifier,
            orders,
            provisioner,
            require_livemode: false,
        }
    }

    /// Reject test-mode events.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }

    /// Processes a delivery and maps the result to the HTTP status the
    /// provider should see.
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> StatusCode {
        match self.process(payload, signature).await {
            Ok(_) => StatusCode::OK,
            Err(e) => e.status_code(),
        }
    }

    pub async fn process(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        let event = self
            .verifier
            .verify_and_parse(payload, signature)
            .map_err(|e| {
                if e.is_authentication_failure() {
                    tracing::warn!(error = %e, "Webhook signature rejected");
                } else {
                    tracing::warn!(error = %e, "Webhook payload rejected");
                }
                e
            })?;

        if self.require_livemode && !event.livemode {
            tracing::warn!(event_id = %event.event_id, "Test mode webhook rejected");
            return Err(WebhookError::TestModeRejected);
        }

        self.settle(&event).await
    }

    async fn settle(&self, event: &PaymentEvent) -> Result<WebhookOutcome, WebhookError> {
        if event.awaits_payment() {
            tracing::info!(
                order_id = %event.session,
                event_id = %event.event_id,
                "Checkout completed without payment, waiting for async result"
            );
            return Ok(WebhookOutcome::AwaitingPayment {
                order_id: event.session.clone(),
            });
        }

        let target = event.outcome.target_state();

        for _ in 0..MAX_SETTLE_ATTEMPTS {
            let order = self.load(&event.session).await?;

            match order.state.plan_transition(target) {
                TransitionPlan::Apply { from, to } => {
                    let reserved = (to == OrderState::Succeeded).then(AccountId::new);
                    let applied = self
                        .orders
                        .compare_and_set_state(&order.id, from, to, reserved.clone())
                        .await
                        .map_err(|e| WebhookError::Database(e.to_string()))?;
                    if !applied {
                        tracing::info!(order_id = %order.id, "Order settled concurrently, re-reading");
                        continue;
                    }

                    tracing::info!(
                        order_id = %order.id,
                        event_id = %event.event_id,
                        from = %from,
                        to = %to,
                        "Order settled"
                    );
                    if to != OrderState::Succeeded {
                        return Ok(WebhookOutcome::Settled {
                            order_id: order.id,
                            state: to,
                        });
                    }
                    let settled = Order {
                        state: to,
                        account_id: reserved,
                        ..order
                    };
                    return self.provision(&settled).await;
                }
                TransitionPlan::AlreadyApplied => {
                    if order.awaits_provisioning() {
                        tracing::info!(order_id = %order.id, "Resuming provisioning for succeeded order");
                        return self.provision(&order).await;
                    }
                    tracing::info!(
                        order_id = %order.id,
                        event_id = %event.event_id,
                        "Webhook already processed"
                    );
                    return Ok(WebhookOutcome::AlreadyProcessed { order_id: order.id });
                }
                TransitionPlan::Rejected { current } => {
                    tracing::warn!(
                        order_id = %order.id,
                        event_id = %event.event_id,
                        current = %current,
                        requested = %target,
                        "Order already settled differently, acknowledging"
                    );
                    return Ok(WebhookOutcome::ConflictingOutcome {
                        order_id: order.id,
                        current,
                        requested: target,
                    });
                }
            }
        }

        Err(WebhookError::Database(format!(
            "order {} kept changing while settling",
            event.session
        )))
    }

    async fn load(&self, id: &OrderId) -> Result<Order, WebhookError> {
        self.orders
            .find_by_id(id)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?
            .ok_or_else(|| {
                tracing::error!(order_id = %id, "Webhook references unknown order");
                WebhookError::OrderNotFound(id.to_string())
            })
    }

    async fn provision(&self, order: &Order) -> Result<WebhookOutcome, WebhookError> {
        let outcome = self.provisioner.provision(order).await.map_err(|e| {
            tracing::error!(order_id = %order.id, error = %e, "Account provisioning failed");
            WebhookError::Database(e.to_string())
        })?;
        Ok(WebhookOutcome::AccountProvisioned {
            order_id: order.id.clone(),
            account_id: outcome.account_id().clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryAccountStore, InMemoryOrderRepository};
    use crate::domain::foundation::{DomainError, Timestamp};
    use crate::domain::order::{OrderRequest, Price};
    use crate::domain::payment::sign_for_test;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SECRET: &str = "whsec_test_secret";

    struct Fixture {
        orders: Arc<InMemoryOrderRepository>,
        accounts: Arc<InMemoryAccountStore>,
        processor: PaymentWebhookProcessor,
    }

    fn fixture() -> Fixture {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let accounts = Arc::new(InMemoryAccountStore::new());
        let processor = PaymentWebhookProcessor::new(
            WebhookVerifier::new(SecretString::new(SECRET.to_string())),
            orders.clone(),
            AccountProvisioner::new(orders.clone(), accounts.clone()),
        );
        Fixture {
            orders,
            accounts,
            processor,
        }
    }

    async fn pending_order(orders: &InMemoryOrderRepository, id: &str) -> Order {
        let order = Order::pending(
            OrderId::new(id).unwrap(),
            OrderRequest::new(vec!["a@x.com".into(), "b@x.com".into()], 4).unwrap(),
            Price {
                amount_minor: 500,
                currency: "usd".into(),
            },
            Timestamp::now(),
        );
        orders.save(&order).await.unwrap();
        order
    }

    fn signed(event_type: &str, session: &str, livemode: bool) -> (String, String) {
        signed_object(event_type, serde_json::json!({"id": session}), livemode)
    }

    fn signed_object(
        event_type: &str,
        object: serde_json::Value,
        livemode: bool,
    ) -> (String, String) {
        let payload = serde_json::json!({
            "id": "evt_1",
            "type": event_type,
            "created": Timestamp::now().as_unix_secs(),
            "livemode": livemode,
            "data": {"object": object}
        })
        .to_string();
        let header = sign_for_test(SECRET, Timestamp::now().as_unix_secs(), &payload);
        (payload, header)
    }

    // ══════════════════════════════════════════════════════════════
    // Success Path Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn completed_checkout_settles_order_and_creates_account() {
        let f = fixture();
        pending_order(&f.orders, "cs_1").await;
        let (payload, header) = signed("checkout.session.completed", "cs_1", false);

        let outcome = f.processor.process(payload.as_bytes(), &header).await.unwrap();

        let order = f.orders.find_by_id(&OrderId::new("cs_1").unwrap()).await.unwrap().unwrap();
        assert_eq!(order.state, OrderState::Succeeded);
        assert!(order.account_provisioned);
        assert_eq!(
            outcome,
            WebhookOutcome::AccountProvisioned {
                order_id: order.id.clone(),
                account_id: order.account_id.clone().unwrap(),
            }
        );

        let accounts = f.accounts.accounts().await;
        assert_eq!(accounts.len(), 1);
        assert_eq!(Some(accounts[0].id.clone()), order.account_id);
    }

    #[tokio::test]
    async fn unpaid_completion_leaves_order_pending() {
        let f = fixture();
        pending_order(&f.orders, "cs_1").await;
        let (payload, header) = signed_object(
            "checkout.session.completed",
            serde_json::json!({"id": "cs_1", "payment_status": "unpaid"}),
            false,
        );

        assert_eq!(f.processor.handle_webhook(payload.as_bytes(), &header).await, StatusCode::OK);
        let outcome = f.processor.process(payload.as_bytes(), &header).await.unwrap();

        assert!(matches!(outcome, WebhookOutcome::AwaitingPayment { .. }));
        let order = f.orders.find_by_id(&OrderId::new("cs_1").unwrap()).await.unwrap().unwrap();
        assert_eq!(order.state, OrderState::Pending);
        assert!(f.accounts.accounts().await.is_empty());
    }

    #[tokio::test]
    async fn async_payment_success_provisions_after_unpaid_completion() {
        let f = fixture();
        pending_order(&f.orders, "cs_1").await;
        let (payload, header) = signed_object(
            "checkout.session.completed",
            serde_json::json!({"id": "cs_1", "payment_status": "unpaid"}),
            false,
        );
        f.processor.process(payload.as_bytes(), &header).await.unwrap();

        let (payload, header) = signed_object(
            "checkout.session.async_payment_succeeded",
            serde_json::json!({"id": "cs_1", "payment_status": "paid"}),
            false,
        );
        let outcome = f.processor.process(payload.as_bytes(), &header).await.unwrap();

        assert!(matches!(outcome, WebhookOutcome::AccountProvisioned { .. }));
        let order = f.orders.find_by_id(&OrderId::new("cs_1").unwrap()).await.unwrap().unwrap();
        assert_eq!(order.state, OrderState::Succeeded);
        assert!(order.account_provisioned);
        assert_eq!(f.accounts.accounts().await.len(), 1);
    }

    #[tokio::test]
    async fn redelivery_creates_no_second_account() {
        let f = fixture();
        pending_order(&f.orders, "cs_1").await;
        let (payload, header) = signed("checkout.session.completed", "cs_1", false);

        assert_eq!(f.processor.handle_webhook(payload.as_bytes(), &header).await, StatusCode::OK);
        let second = f.processor.process(payload.as_bytes(), &header).await.unwrap();

        assert!(matches!(second, WebhookOutcome::AlreadyProcessed { .. }));
        assert_eq!(f.accounts.accounts().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_deliveries_create_one_account() {
        let f = fixture();
        pending_order(&f.orders, "cs_1").await;
        let (payload, header) = signed("checkout.session.completed", "cs_1", false);

        let (a, b) = tokio::join!(
            f.processor.handle_webhook(payload.as_bytes(), &header),
            f.processor.handle_webhook(payload.as_bytes(), &header)
        );

        assert_eq!(a, StatusCode::OK);
        assert_eq!(b, StatusCode::OK);
        assert_eq!(f.accounts.accounts().await.len(), 1);
    }

    #[tokio::test]
    async fn provisioning_failure_is_retried_by_redelivery() {
        let f = fixture();
        pending_order(&f.orders, "cs_1").await;
        let (payload, header) = signed("checkout.session.completed", "cs_1", false);

        f.accounts.set_fail_inserts(true);
        assert_eq!(
            f.processor.handle_webhook(payload.as_bytes(), &header).await,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let order = f.orders.find_by_id(&OrderId::new("cs_1").unwrap()).await.unwrap().unwrap();
        assert!(order.awaits_provisioning());

        f.accounts.set_fail_inserts(false);
        let outcome = f.processor.process(payload.as_bytes(), &header).await.unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::AccountProvisioned {
                order_id: order.id.clone(),
                account_id: order.account_id.clone().unwrap(),
            }
        );
        assert_eq!(f.accounts.accounts().await.len(), 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Other Outcomes
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn expired_checkout_cancels_order_without_account() {
        let f = fixture();
        pending_order(&f.orders, "cs_1").await;
        let (payload, header) = signed("checkout.session.expired", "cs_1", false);

        let outcome = f.processor.process(payload.as_bytes(), &header).await.unwrap();

        assert!(matches!(
            outcome,
            WebhookOutcome::Settled { state: OrderState::Cancelled, .. }
        ));
        assert!(f.accounts.accounts().await.is_empty());
    }

    #[tokio::test]
    async fn late_success_after_expiry_is_acknowledged_without_change() {
        let f = fixture();
        pending_order(&f.orders, "cs_1").await;
        let (expired, expired_sig) = signed("checkout.session.expired", "cs_1", false);
        f.processor.process(expired.as_bytes(), &expired_sig).await.unwrap();

        let (completed, completed_sig) = signed("checkout.session.completed", "cs_1", false);
        let status = f.processor.handle_webhook(completed.as_bytes(), &completed_sig).await;

        assert_eq!(status, StatusCode::OK);
        let order = f.orders.find_by_id(&OrderId::new("cs_1").unwrap()).await.unwrap().unwrap();
        assert_eq!(order.state, OrderState::Cancelled);
        assert!(f.accounts.accounts().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_order_is_a_server_error() {
        let f = fixture();
        let (payload, header) = signed("checkout.session.completed", "cs_missing", false);

        assert_eq!(
            f.processor.handle_webhook(payload.as_bytes(), &header).await,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn unsupported_event_is_a_bad_request() {
        let f = fixture();
        pending_order(&f.orders, "cs_1").await;
        let (payload, header) = signed("payment_intent.succeeded", "cs_1", false);

        assert_eq!(
            f.processor.handle_webhook(payload.as_bytes(), &header).await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_mode_event_rejected_when_live_required() {
        let f = fixture();
        let processor = f.processor.with_require_livemode(true);
        pending_order(&f.orders, "cs_1").await;
        let (payload, header) = signed("checkout.session.completed", "cs_1", false);

        assert!(matches!(
            processor.process(payload.as_bytes(), &header).await,
            Err(WebhookError::TestModeRejected)
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Tests
    // ══════════════════════════════════════════════════════════════

    /// Counts lookups so tests can prove a rejected webhook touched nothing.
    struct CountingOrders {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl OrderRepository for CountingOrders {
        async fn save(&self, _order: &Order) -> Result<(), DomainError> {
            Ok(())
        }
        async fn find_by_id(&self, _id: &OrderId) -> Result<Option<Order>, DomainError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
        async fn compare_and_set_state(
            &self,
            _id: &OrderId,
            _expected: OrderState,
            _next: OrderState,
            _account_id: Option<AccountId>,
        ) -> Result<bool, DomainError> {
            Ok(false)
        }
        async fn mark_provisioned(&self, _id: &OrderId) -> Result<(), DomainError> {
            Ok(())
        }
        async fn find_awaiting_provisioning(&self, _limit: u32) -> Result<Vec<Order>, DomainError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn invalid_signature_is_rejected_before_any_lookup() {
        let orders = Arc::new(CountingOrders {
            lookups: AtomicUsize::new(0),
        });
        let accounts = Arc::new(InMemoryAccountStore::new());
        let processor = PaymentWebhookProcessor::new(
            WebhookVerifier::new(SecretString::new(SECRET.to_string())),
            orders.clone(),
            AccountProvisioner::new(orders.clone(), accounts.clone()),
        );
        let (payload, _) = signed("checkout.session.completed", "cs_1", false);
        let forged = sign_for_test("whsec_wrong", Timestamp::now().as_unix_secs(), &payload);

        let status = processor.handle_webhook(payload.as_bytes(), &forged).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(orders.lookups.load(Ordering::SeqCst), 0);
        assert!(accounts.accounts().await.is_empty());
    }
}
