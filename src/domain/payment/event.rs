//! Payment provider webhook events.
//!
//! The raw Stripe envelope is decoded first, then narrowed to a typed
//! [`PaymentEvent`]. Only the checkout session family is accepted.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::OrderId;
use crate::domain::order::OrderState;

use super::errors::WebhookError;

/// Stripe webhook envelope. Fields we do not use are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// Polymorphic by event type.
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: Option<String>,
    #[serde(default)]
    payment_status: Option<PaymentStatus>,
}

/// `payment_status` of a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
    #[serde(other)]
    Unknown,
}

/// What happened to a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Completed,
    AsyncPaymentSucceeded,
    Expired,
    AsyncPaymentFailed,
}

impl CheckoutOutcome {
    fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "checkout.session.completed" => Some(Self::Completed),
            "checkout.session.async_payment_succeeded" => Some(Self::AsyncPaymentSucceeded),
            "checkout.session.expired" => Some(Self::Expired),
            "checkout.session.async_payment_failed" => Some(Self::AsyncPaymentFailed),
            _ => None,
        }
    }

    /// Order state this outcome settles into.
    pub fn target_state(&self) -> OrderState {
        match self {
            CheckoutOutcome::Completed | CheckoutOutcome::AsyncPaymentSucceeded => {
                OrderState::Succeeded
            }
            CheckoutOutcome::Expired => OrderState::Cancelled,
            CheckoutOutcome::AsyncPaymentFailed => OrderState::Failed,
        }
    }
}

/// A validated checkout session event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub event_id: String,
    pub session: OrderId,
    pub outcome: CheckoutOutcome,
    /// Absent on older payloads; treated as paid.
    pub payment_status: Option<PaymentStatus>,
    pub livemode: bool,
}

impl PaymentEvent {
    /// A completed session whose delayed payment method has not cleared.
    /// `async_payment_succeeded` follows once it does.
    pub fn awaits_payment(&self) -> bool {
        self.outcome == CheckoutOutcome::Completed
            && self.payment_status == Some(PaymentStatus::Unpaid)
    }
}

impl TryFrom<StripeEvent> for PaymentEvent {
    type Error = WebhookError;

    fn try_from(event: StripeEvent) -> Result<Self, Self::Error> {
        let outcome = CheckoutOutcome::from_event_type(&event.event_type)
            .ok_or_else(|| WebhookError::UnsupportedEvent(event.event_type.clone()))?;

        let object: CheckoutSessionObject = serde_json::from_value(event.data.object)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let session = object
            .id
            .and_then(|id| OrderId::new(id).ok())
            .ok_or(WebhookError::MissingField("data.object.id"))?;

        Ok(PaymentEvent {
            event_id: event.id,
            session,
            outcome,
            payment_status: object.payment_status,
            livemode: event.livemode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str, object: serde_json::Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "created": 1_700_000_000,
            "livemode": false,
            "data": {"object": object}
        }))
        .unwrap()
    }

    #[test]
    fn completed_session_settles_as_succeeded() {
        let event =
            PaymentEvent::try_from(envelope("checkout.session.completed", json!({"id": "cs_1"})))
                .unwrap();
        assert_eq!(event.session.as_str(), "cs_1");
        assert_eq!(event.outcome.target_state(), OrderState::Succeeded);
        assert_eq!(event.event_id, "evt_1");
    }

    #[test]
    fn expired_and_failed_sessions_map_to_terminal_states() {
        let expired =
            PaymentEvent::try_from(envelope("checkout.session.expired", json!({"id": "cs_1"})))
                .unwrap();
        assert_eq!(expired.outcome.target_state(), OrderState::Cancelled);

        let failed = PaymentEvent::try_from(envelope(
            "checkout.session.async_payment_failed",
            json!({"id": "cs_1"}),
        ))
        .unwrap();
        assert_eq!(failed.outcome.target_state(), OrderState::Failed);
    }

    #[test]
    fn other_event_families_are_unsupported() {
        let err = PaymentEvent::try_from(envelope("invoice.paid", json!({"id": "in_1"})))
            .unwrap_err();
        assert!(matches!(err, WebhookError::UnsupportedEvent(t) if t == "invoice.paid"));
    }

    #[test]
    fn unknown_session_action_is_unsupported() {
        let err = PaymentEvent::try_from(envelope(
            "checkout.session.async_payment_pending",
            json!({"id": "cs_1"}),
        ))
        .unwrap_err();
        assert!(matches!(err, WebhookError::UnsupportedEvent(_)));
    }

    #[test]
    fn async_payment_success_settles_as_succeeded() {
        let event = PaymentEvent::try_from(envelope(
            "checkout.session.async_payment_succeeded",
            json!({"id": "cs_1", "payment_status": "paid"}),
        ))
        .unwrap();
        assert_eq!(event.outcome, CheckoutOutcome::AsyncPaymentSucceeded);
        assert_eq!(event.outcome.target_state(), OrderState::Succeeded);
        assert!(!event.awaits_payment());
    }

    #[test]
    fn unpaid_completed_session_awaits_payment() {
        let event = PaymentEvent::try_from(envelope(
            "checkout.session.completed",
            json!({"id": "cs_1", "payment_status": "unpaid"}),
        ))
        .unwrap();
        assert_eq!(event.payment_status, Some(PaymentStatus::Unpaid));
        assert!(event.awaits_payment());
    }

    #[test]
    fn payment_status_is_optional_and_tolerates_new_values() {
        let missing =
            PaymentEvent::try_from(envelope("checkout.session.completed", json!({"id": "cs_1"})))
                .unwrap();
        assert_eq!(missing.payment_status, None);
        assert!(!missing.awaits_payment());

        let novel = PaymentEvent::try_from(envelope(
            "checkout.session.completed",
            json!({"id": "cs_1", "payment_status": "something_new"}),
        ))
        .unwrap();
        assert_eq!(novel.payment_status, Some(PaymentStatus::Unknown));
    }

    #[test]
    fn missing_session_id_is_rejected() {
        let err = PaymentEvent::try_from(envelope("checkout.session.completed", json!({})))
            .unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("data.object.id")));
    }

    #[test]
    fn non_object_payload_is_a_parse_error() {
        let err = PaymentEvent::try_from(envelope("checkout.session.completed", json!(42)))
            .unwrap_err();
        assert!(matches!(err, WebhookError::ParseError(_)));
    }
}
