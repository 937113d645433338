//! Bulk templated mail port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One addressee of a bulk send, with its own template data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkDestination {
    pub address: String,
    /// Merged over `default_data` for this destination.
    pub replacement_data: Value,
}

/// A templated message sent to many destinations in one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkTemplatedMessage {
    pub source: String,
    pub template: String,
    pub default_data: Value,
    pub destinations: Vec<BulkDestination>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedDestination {
    pub address: String,
    pub reason: String,
}

/// Per-destination outcome of a bulk call that went through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkSendReport {
    pub accepted: Vec<String>,
    pub rejected: Vec<RejectedDestination>,
}

impl BulkSendReport {
    pub fn merge(&mut self, other: BulkSendReport) {
        self.accepted.extend(other.accepted);
        self.rejected.extend(other.rejected);
    }
}

/// Failure of the bulk call as a whole.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),

    #[error("mail provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("mail provider response could not be read: {0}")]
    InvalidResponse(String),

    #[error("no mail template named '{0}'")]
    UnknownTemplate(String),
}

#[async_trait]
pub trait BulkMailer: Send + Sync {
    async fn send_bulk_templated(
        &self,
        message: BulkTemplatedMessage,
    ) -> Result<BulkSendReport, MailError>;
}
