//! Account change feed port.
//!
//! Records are delivered at least once: anything not acknowledged is handed
//! out again on the next poll.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::foundation::DomainError;

/// An undelivered change record in raw form.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    /// Position in the feed; strictly increasing.
    pub sequence: i64,
    pub payload: Value,
}

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Oldest unacknowledged records, in sequence order.
    async fn pending(&self, limit: u32) -> Result<Vec<PendingChange>, DomainError>;

    /// Marks one record as done. Acknowledging twice is harmless.
    async fn acknowledge(&self, sequence: i64) -> Result<(), DomainError>;
}
