//! NotificationDispatcher - sends the introductory message to every
//! recipient of a new account.
//!
//! Delivery is at most once per recipient. Recipients are sent in chunks and
//! each chunk (`{account id}:{chunk index}`) is claimed in the dedup ledger
//! before it is sent. A chunk whose send call fails is released, so a
//! redelivered change record resends exactly the chunks that did not go out.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;

use crate::domain::account::{Account, MailDomain};
use crate::domain::foundation::DomainError;
use crate::ports::{
    BulkDestination, BulkMailer, BulkSendReport, BulkTemplatedMessage, MailError,
    ProcessedEventStore, RejectedDestination,
};

/// Ledger handler name for intro messages.
pub const INTRO_HANDLER: &str = "intro";

/// Provider limit on destinations per bulk call.
pub const MAX_DESTINATIONS_PER_CALL: usize = 50;

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub domain: MailDomain,
    /// Local part of the sender address.
    pub sender: String,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntroOutcome {
    Sent { accepted: usize },
    /// Earlier deliveries already claimed every chunk.
    AlreadySent,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("dedup ledger unavailable: {0}")]
    Ledger(#[from] DomainError),

    #[error("bulk send failed after {accepted} accepted: {source}")]
    Send {
        accepted: usize,
        #[source]
        source: MailError,
    },

    #[error("{} recipient(s) rejected by the mail provider", rejected.len())]
    PartialDelivery { rejected: Vec<RejectedDestination> },
}

pub struct NotificationDispatcher {
    mailer: Arc<dyn BulkMailer>,
    ledger: Arc<dyn ProcessedEventStore>,
    settings: NotificationSettings,
}

impl NotificationDispatcher {
    pub fn new(
        mailer: Arc<dyn BulkMailer>,
        ledger: Arc<dyn ProcessedEventStore>,
        settings: NotificationSettings,
    ) -> Self {
        Self {
            mailer,
            ledger,
            settings,
        }
    }

    pub async fn send_intro(&self, account: &Account) -> Result<IntroOutcome, NotificationError> {
        if !account.has_recipients() {
            return Ok(IntroOutcome::Sent { accepted: 0 });
        }

        let source = self.settings.domain.mailbox(&self.settings.sender);
        let mut report = BulkSendReport::default();
        let mut sent_chunks = 0;

        for (index, chunk) in account.recipients.chunks(MAX_DESTINATIONS_PER_CALL).enumerate() {
            let key = chunk_key(account, index);
            if !self.ledger.try_claim(&key, INTRO_HANDLER).await? {
                tracing::debug!(account_id = %account.id, chunk = index, "Intro chunk already sent, skipping");
                continue;
            }

            let message = BulkTemplatedMessage {
                source: source.clone(),
                template: self.settings.template.clone(),
                default_data: json!({ "id": account.id.to_string() }),
                destinations: chunk
                    .iter()
                    .map(|r| BulkDestination {
                        address: r.address.clone(),
                        replacement_data: json!({ "token": r.unsubscribe_token.as_str() }),
                    })
                    .collect(),
            };

            match self.mailer.send_bulk_templated(message).await {
                Ok(chunk_report) => {
                    sent_chunks += 1;
                    report.merge(chunk_report);
                }
                Err(source) => {
                    self.ledger.release(&key, INTRO_HANDLER).await?;
                    let accepted = report.accepted.len();
                    tracing::error!(
                        account_id = %account.id,
                        chunk = index,
                        accepted,
                        error = %source,
                        "Intro bulk send failed"
                    );
                    return Err(NotificationError::Send { accepted, source });
                }
            }
        }

        if sent_chunks == 0 {
            tracing::info!(account_id = %account.id, "Intro already sent, skipping");
            return Ok(IntroOutcome::AlreadySent);
        }

        if !report.rejected.is_empty() {
            tracing::warn!(
                account_id = %account.id,
                accepted = report.accepted.len(),
                rejected = report.rejected.len(),
                "Intro partially delivered"
            );
            return Err(NotificationError::PartialDelivery {
                rejected: report.rejected,
            });
        }

        tracing::info!(
            account_id = %account.id,
            accepted = report.accepted.len(),
            "Intro sent"
        );
        Ok(IntroOutcome::Sent {
            accepted: report.accepted.len(),
        })
    }
}

fn chunk_key(account: &Account, index: usize) -> String {
    format!("{}:{}", account.id, index)
}
