//! In-memory versioned mail route.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::{MailRouteStore, MailRule, RouteList, WriteOutcome};

#[derive(Default)]
pub struct InMemoryMailRouteStore {
    routes: Mutex<HashMap<MailRule, RouteList>>,
    forced_conflicts: AtomicU32,
}

impl InMemoryMailRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` writes report a conflict and bump the version, as if
    /// another writer had got in first.
    pub fn force_conflicts(&self, n: u32) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    pub async fn recipients(&self, rule: &MailRule) -> Vec<String> {
        self.routes
            .lock()
            .await
            .get(rule)
            .map(|r| r.recipients.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MailRouteStore for InMemoryMailRouteStore {
    async fn fetch(&self, rule: &MailRule) -> Result<RouteList, DomainError> {
        Ok(self
            .routes
            .lock()
            .await
            .get(rule)
            .cloned()
            .unwrap_or_default())
    }

    async fn write(
        &self,
        rule: &MailRule,
        recipients: &[String],
        expected_version: u64,
    ) -> Result<WriteOutcome, DomainError> {
        let mut routes = self.routes.lock().await;
        let current = routes.entry(rule.clone()).or_default();

        let forced = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            current.version += 1;
            return Ok(WriteOutcome::Conflict);
        }

        if current.version != expected_version {
            return Ok(WriteOutcome::Conflict);
        }
        current.recipients = recipients.to_vec();
        current.version += 1;
        Ok(WriteOutcome::Written)
    }
}
