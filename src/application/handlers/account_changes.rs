//! AccountChangeProcessor - turns account change records into mail route
//! updates and intro messages.
//!
//! Each record in a batch is handled on its own and reported on its own, so
//! the caller can acknowledge exactly the records that are done. Re-applying
//! a record is safe: route updates are set operations and the intro is
//! deduplicated by account id. An `INSERT` for an account that has already
//! expired is skipped, since its `REMOVE` may have been applied first.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::domain::account::MailDomain;
use crate::domain::change::{AccountChange, ChangeDecodeError, ChangeRecord};
use crate::domain::foundation::Timestamp;
use crate::ports::PendingChange;

use super::send_intro::{NotificationDispatcher, NotificationError};
use crate::application::mail_route_sync::{MailRouteError, MailRouteSyncHandle};

#[derive(Debug, Error)]
pub enum ChangeProcessingError {
    #[error(transparent)]
    Malformed(#[from] ChangeDecodeError),

    #[error("mail route update failed: {0}")]
    Route(#[from] MailRouteError),

    #[error("intro notification failed: {0}")]
    Notification(#[from] NotificationError),
}

impl ChangeProcessingError {
    /// Retrying cannot fix this record.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ChangeProcessingError::Malformed(_)
                | ChangeProcessingError::Notification(NotificationError::PartialDelivery { .. })
        )
    }
}

/// Outcome of one record.
#[derive(Debug)]
pub enum ItemOutcome {
    Applied,
    /// Could never succeed; acknowledge it and keep it in the logs.
    DeadLettered(ChangeProcessingError),
    /// Leave unacknowledged so it is delivered again.
    Failed(ChangeProcessingError),
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<(i64, ItemOutcome)>,
}

impl BatchReport {
    /// Sequences that should not be delivered again.
    pub fn acknowledgeable(&self) -> impl Iterator<Item = i64> + '_ {
        self.items.iter().filter_map(|(sequence, outcome)| match outcome {
            ItemOutcome::Applied | ItemOutcome::DeadLettered(_) => Some(*sequence),
            ItemOutcome::Failed(_) => None,
        })
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, o)| matches!(o, ItemOutcome::Failed(_)))
            .count()
    }
}

pub struct AccountChangeProcessor {
    routes: MailRouteSyncHandle,
    notifications: Arc<NotificationDispatcher>,
    domain: MailDomain,
}

impl AccountChangeProcessor {
    pub fn new(
        routes: MailRouteSyncHandle,
        notifications: Arc<NotificationDispatcher>,
        domain: MailDomain,
    ) -> Self {
        Self {
            routes,
            notifications,
            domain,
        }
    }

    pub async fn process_batch(&self, batch: &[PendingChange]) -> BatchReport {
        let mut report = BatchReport::default();

        for change in batch {
            let outcome = match self.process_record(&change.payload).await {
                Ok(()) => ItemOutcome::Applied,
                Err(e) if e.is_permanent() => {
                    tracing::error!(
                        sequence = change.sequence,
                        error = %e,
                        payload = %change.payload,
                        "Dead-lettering change record"
                    );
                    ItemOutcome::DeadLettered(e)
                }
                Err(e) => {
                    tracing::error!(
                        sequence = change.sequence,
                        error = %e,
                        "Change record failed, will be redelivered"
                    );
                    ItemOutcome::Failed(e)
                }
            };
            report.items.push((change.sequence, outcome));
        }

        report
    }

    pub async fn process_record(&self, raw: &Value) -> Result<(), ChangeProcessingError> {
        let change = ChangeRecord::decode(raw)?;
        let account = change.account();
        let address = self.domain.address_for(&account.id);

        match &change {
            AccountChange::Inserted(account) if account.is_expired(&Timestamp::now()) => {
                tracing::warn!(account_id = %account.id, "Skipping insert of already expired account");
            }
            AccountChange::Inserted(account) => {
                let route = self.routes.activate(&address).await?;
                tracing::info!(account_id = %account.id, address = %address, route = ?route, "Account activated");
                self.notifications.send_intro(account).await?;
            }
            AccountChange::Removed(account) => {
                let route = self.routes.deactivate(&address).await?;
                tracing::info!(account_id = %account.id, address = %address, route = ?route, "Account deactivated");
            }
        }
        Ok(())
    }
}
