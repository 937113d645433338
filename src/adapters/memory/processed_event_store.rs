//! In-memory dedup ledger.

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::ProcessedEventStore;

#[derive(Default)]
pub struct InMemoryProcessedEventStore {
    claimed: Mutex<HashSet<(String, String)>>,
}

impl InMemoryProcessedEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(key: &str, handler_name: &str) -> (String, String) {
    (key.to_string(), handler_name.to_string())
}

#[async_trait]
impl ProcessedEventStore for InMemoryProcessedEventStore {
    async fn try_claim(&self, k: &str, handler_name: &str) -> Result<bool, DomainError> {
        Ok(self.claimed.lock().await.insert(key(k, handler_name)))
    }

    async fn release(&self, k: &str, handler_name: &str) -> Result<(), DomainError> {
        self.claimed.lock().await.remove(&key(k, handler_name));
        Ok(())
    }
}
