//! Mock payment provider.
//!
//! Issues `cs_mock_<n>` session ids, records every request, and can be told
//! to fail the next call. Used in development without Stripe keys and in tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{CheckoutSession, CreateCheckoutRequest, PaymentError, PaymentProvider};

#[derive(Default)]
pub struct MockPaymentProvider {
    inner: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    next_error: Option<PaymentError>,
    requests: Vec<CreateCheckoutRequest>,
    issued: u64,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next call with `error`.
    pub fn set_error(&self, error: PaymentError) {
        if let Ok(mut state) = self.inner.lock() {
            state.next_error = Some(error);
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CreateCheckoutRequest> {
        self.inner
            .lock()
            .map(|state| state.requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| PaymentError::provider("mock state poisoned"))?;

        state.requests.push(request);
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        state.issued += 1;
        let id = format!("cs_mock_{}", state.issued);
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.mock/pay/{}", id)),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateCheckoutRequest {
        CreateCheckoutRequest {
            line_item_name: "item".into(),
            line_item_description: "desc".into(),
            amount_minor: 500,
            currency: "usd".into(),
            success_url: "https://ok".into(),
            cancel_url: "https://cancel".into(),
            metadata: vec![],
        }
    }

    #[tokio::test]
    async fn issues_distinct_session_ids() {
        let mock = MockPaymentProvider::new();
        let a = mock.create_checkout_session(request()).await.unwrap();
        let b = mock.create_checkout_session(request()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn injected_error_fails_once() {
        let mock = MockPaymentProvider::new();
        mock.set_error(PaymentError::network("down"));

        assert!(mock.create_checkout_session(request()).await.is_err());
        assert!(mock.create_checkout_session(request()).await.is_ok());
    }
}
