//! Bulk mailer that records messages instead of sending them.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::ports::{
    BulkMailer, BulkSendReport, BulkTemplatedMessage, MailError, RejectedDestination,
};

/// Records every bulk send. Destinations listed via [`reject`](Self::reject)
/// come back rejected; [`set_unavailable`](Self::set_unavailable) fails whole calls.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<BulkTemplatedMessage>>,
    rejected: Mutex<HashSet<String>>,
    unavailable: AtomicBool,
    fail_countdown: Mutex<Option<usize>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reject(&self, address: impl Into<String>) {
        self.rejected.lock().await.insert(address.into());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Lets `calls` more sends through, then fails exactly one.
    pub async fn fail_after(&self, calls: usize) {
        *self.fail_countdown.lock().await = Some(calls);
    }

    /// Every message accepted by the transport, in call order.
    pub async fn sent(&self) -> Vec<BulkTemplatedMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl BulkMailer for RecordingMailer {
    async fn send_bulk_templated(
        &self,
        message: BulkTemplatedMessage,
    ) -> Result<BulkSendReport, MailError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MailError::Transport("mailer unavailable".to_string()));
        }
        {
            let mut countdown = self.fail_countdown.lock().await;
            match *countdown {
                Some(0) => {
                    *countdown = None;
                    return Err(MailError::Transport("mailer unavailable".to_string()));
                }
                Some(n) => *countdown = Some(n - 1),
                None => {}
            }
        }

        let rejected = self.rejected.lock().await;
        let mut report = BulkSendReport::default();
        for destination in &message.destinations {
            if rejected.contains(&destination.address) {
                report.rejected.push(RejectedDestination {
                    address: destination.address.clone(),
                    reason: "MessageRejected".to_string(),
                });
            } else {
                report.accepted.push(destination.address.clone());
            }
        }
        drop(rejected);

        tracing::info!(
            source = %message.source,
            template = %message.template,
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "Recorded bulk send"
        );
        self.sent.lock().await.push(message);
        Ok(report)
    }
}
