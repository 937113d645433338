//! CreateOrderHandler - opens a checkout session and records a pending order.

use std::sync::Arc;

use crate::domain::account::MailDomain;
use crate::domain::foundation::{OrderId, Timestamp};
use crate::domain::order::{FlatPricing, Order, OrderError, OrderRequest};
use crate::ports::{CreateCheckoutRequest, OrderRepository, PaymentProvider};

/// Command to place an order.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub recipients: Vec<String>,
    pub weeks: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderResult {
    pub checkout_reference: String,
    pub checkout_url: Option<String>,
}

/// Where the hosted checkout sends the buyer afterwards.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub domain: MailDomain,
    pub success_url: String,
    pub cancel_url: String,
}

pub struct CreateOrderHandler {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentProvider>,
    pricing: FlatPricing,
    checkout: CheckoutSettings,
}

impl CreateOrderHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentProvider>,
        pricing: FlatPricing,
        checkout: CheckoutSettings,
    ) -> Self {
        Self {
            orders,
            payments,
            pricing,
            checkout,
        }
    }

    pub async fn handle(&self, cmd: CreateOrderCommand) -> Result<CreateOrderResult, OrderError> {
        let request = OrderRequest::new(cmd.recipients, cmd.weeks)?;
        let price = self.pricing.quote(request.recipients().len(), request.weeks());

        let session = self
            .payments
            .create_checkout_session(CreateCheckoutRequest {
                line_item_name: format!("Shared email address from {}", self.checkout.domain.as_str()),
                line_item_description: format!(
                    "{} recipients, {} weeks",
                    request.recipients().len(),
                    request.weeks()
                ),
                amount_minor: price.amount_minor,
                currency: price.currency.clone(),
                success_url: self.checkout.success_url.clone(),
                cancel_url: self.checkout.cancel_url.clone(),
                metadata: vec![
                    ("order_weeks".to_string(), request.weeks().to_string()),
                    (
                        "recipient_count".to_string(),
                        request.recipients().len().to_string(),
                    ),
                ],
            })
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    provider_code = ?e.provider_code,
                    retryable = e.code.is_retryable(),
                    "Checkout session creation failed"
                );
                OrderError::payment_provider(e.message)
            })?;

        let order_id = OrderId::new(session.id)
            .map_err(|_| OrderError::payment_provider("provider returned an empty session id"))?;
        let order = Order::pending(order_id, request, price, Timestamp::now());
        self.orders.save(&order).await?;

        tracing::info!(
            order_id = %order.id,
            recipients = order.recipients.len(),
            weeks = order.weeks,
            amount = order.price.amount_minor,
            "Order created"
        );

        Ok(CreateOrderResult {
            checkout_reference: order.id.to_string(),
            checkout_url: session.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryOrderRepository;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::order::OrderState;
    use crate::ports::PaymentError;

    fn handler(
        orders: Arc<InMemoryOrderRepository>,
        payments: Arc<MockPaymentProvider>,
    ) -> CreateOrderHandler {
        CreateOrderHandler::new(
            orders,
            payments,
            FlatPricing::new(500, "usd"),
            CheckoutSettings {
                domain: MailDomain::new("pool.example"),
                success_url: "https://pool.example/ok".into(),
                cancel_url: "https://pool.example/cancel".into(),
            },
        )
    }

    fn command(recipients: &[&str], weeks: i64) -> CreateOrderCommand {
        CreateOrderCommand {
            recipients: recipients.iter().map(|s| s.to_string()).collect(),
            weeks,
        }
    }

    #[tokio::test]
    async fn persists_pending_order_keyed_by_session() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let payments = Arc::new(MockPaymentProvider::new());
        let handler = handler(orders.clone(), payments.clone());

        let result = handler.handle(command(&["a@x.com", "b@x.com"], 4)).await.unwrap();

        let order = orders
            .find_by_id(&OrderId::new(result.checkout_reference.clone()).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.state, OrderState::Pending);
        assert_eq!(order.weeks, 4);
        assert_eq!(order.recipients, vec!["a@x.com".to_string(), "b@x.com".to_string()]);
        assert_eq!(order.price.amount_minor, 500);
        assert!(result.checkout_url.is_some());
    }

    #[tokio::test]
    async fn describes_line_item_for_checkout() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let payments = Arc::new(MockPaymentProvider::new());
        let handler = handler(orders, payments.clone());

        handler.handle(command(&["a@x.com", "b@x.com"], 4)).await.unwrap();

        let request = &payments.requests()[0];
        assert_eq!(request.line_item_name, "Shared email address from pool.example");
        assert_eq!(request.line_item_description, "2 recipients, 4 weeks");
        assert_eq!(request.amount_minor, 500);
    }

    #[tokio::test]
    async fn invalid_input_has_no_side_effects() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let payments = Arc::new(MockPaymentProvider::new());
        let handler = handler(orders.clone(), payments.clone());

        let empty = handler.handle(command(&[], 4)).await;
        let zero_weeks = handler.handle(command(&["a@x.com"], 0)).await;

        assert!(matches!(empty, Err(OrderError::ValidationFailed { .. })));
        assert!(matches!(zero_weeks, Err(OrderError::ValidationFailed { .. })));
        assert!(payments.requests().is_empty());
        assert_eq!(orders.len().await, 0);
    }

    #[tokio::test]
    async fn provider_failure_stores_nothing() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let payments = Arc::new(MockPaymentProvider::new());
        payments.set_error(PaymentError::network("timeout"));
        let handler = handler(orders.clone(), payments);

        let result = handler.handle(command(&["a@x.com"], 1)).await;

        assert!(matches!(result, Err(OrderError::PaymentProvider(_))));
        assert_eq!(orders.len().await, 0);
    }
}
