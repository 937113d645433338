//! MailRouteSync - single owner of the shared mail route allow-list.
//!
//! Every activate/deactivate is sent as a command to one task, so at most one
//! read-modify-write is in flight per process. Each write is also conditional
//! on the version that was read, and retried on conflict, so writers in other
//! processes cannot lose our updates either.
//!
//! ```ignore
//! let (handle, task) = MailRouteSync::spawn(store, rule, 5, 64);
//! handle.activate("3f2c...@pool.example").await?;
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::domain::foundation::DomainError;
use crate::ports::{MailRouteStore, MailRule, WriteOutcome};

/// Effect of one command on the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChange {
    Added,
    Removed,
    /// The list already had the requested membership.
    Unchanged,
}

#[derive(Debug, Error)]
pub enum MailRouteError {
    #[error("mail route store unavailable: {0}")]
    Unavailable(#[from] DomainError),

    #[error("mail route write kept conflicting after {attempts} attempts")]
    ConflictRetriesExhausted { attempts: u32 },

    #[error("mail route sync task has stopped")]
    ActorStopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteOp {
    Activate,
    Deactivate,
}

struct Command {
    op: RouteOp,
    address: String,
    reply: oneshot::Sender<Result<RouteChange, MailRouteError>>,
}

/// Cloneable sender side of the actor.
#[derive(Clone)]
pub struct MailRouteSyncHandle {
    sender: mpsc::Sender<Command>,
}

impl MailRouteSyncHandle {
    /// Ensures `address` is on the list.
    pub async fn activate(&self, address: &str) -> Result<RouteChange, MailRouteError> {
        self.submit(RouteOp::Activate, address).await
    }

    /// Ensures `address` is not on the list.
    pub async fn deactivate(&self, address: &str) -> Result<RouteChange, MailRouteError> {
        self.submit(RouteOp::Deactivate, address).await
    }

    async fn submit(&self, op: RouteOp, address: &str) -> Result<RouteChange, MailRouteError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Command {
                op,
                address: address.to_string(),
                reply,
            })
            .await
            .map_err(|_| MailRouteError::ActorStopped)?;
        response.await.map_err(|_| MailRouteError::ActorStopped)?
    }
}

/// The actor. Owns the receiver; runs until every handle is dropped.
pub struct MailRouteSync {
    store: Arc<dyn MailRouteStore>,
    rule: MailRule,
    max_conflict_retries: u32,
    receiver: mpsc::Receiver<Command>,
}

impl MailRouteSync {
    pub fn new(
        store: Arc<dyn MailRouteStore>,
        rule: MailRule,
        max_conflict_retries: u32,
        capacity: usize,
    ) -> (Self, MailRouteSyncHandle) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let actor = Self {
            store,
            rule,
            max_conflict_retries,
            receiver,
        };
        (actor, MailRouteSyncHandle { sender })
    }

    /// Creates the actor and runs it on the current runtime.
    pub fn spawn(
        store: Arc<dyn MailRouteStore>,
        rule: MailRule,
        max_conflict_retries: u32,
        capacity: usize,
    ) -> (MailRouteSyncHandle, JoinHandle<()>) {
        let (actor, handle) = Self::new(store, rule, max_conflict_retries, capacity);
        (handle, tokio::spawn(actor.run()))
    }

    pub async fn run(mut self) {
        tracing::info!(rule = %self.rule, "Mail route sync started");
        while let Some(command) = self.receiver.recv().await {
            let result = self.apply(command.op, &command.address).await;
            if let Err(e) = &result {
                tracing::error!(
                    rule = %self.rule,
                    address = %command.address,
                    op = ?command.op,
                    error = %e,
                    "Mail route update failed"
                );
            }
            // The caller may have given up waiting; the update stands either way.
            let _ = command.reply.send(result);
        }
        tracing::info!(rule = %self.rule, "Mail route sync stopped");
    }

    async fn apply(&self, op: RouteOp, address: &str) -> Result<RouteChange, MailRouteError> {
        let attempts = self.max_conflict_retries + 1;

        for attempt in 1..=attempts {
            let current = self.store.fetch(&self.rule).await?;
            let present = current
                .recipients
                .iter()
                .any(|r| r.eq_ignore_ascii_case(address));

            let (next, change) = match (op, present) {
                (RouteOp::Activate, true) | (RouteOp::Deactivate, false) => {
                    return Ok(RouteChange::Unchanged)
                }
                (RouteOp::Activate, false) => {
                    let mut next = current.recipients.clone();
                    next.push(address.to_string());
                    (next, RouteChange::Added)
                }
                (RouteOp::Deactivate, true) => {
                    let next: Vec<String> = current
                        .recipients
                        .iter()
                        .filter(|r| !r.eq_ignore_ascii_case(address))
                        .cloned()
                        .collect();
                    (next, RouteChange::Removed)
                }
            };

            match self.store.write(&self.rule, &next, current.version).await? {
                WriteOutcome::Written => {
                    tracing::info!(
                        rule = %self.rule,
                        address = %address,
                        change = ?change,
                        version = current.version + 1,
                        "Mail route updated"
                    );
                    return Ok(change);
                }
                WriteOutcome::Conflict => {
                    tracing::warn!(
                        rule = %self.rule,
                        address = %address,
                        attempt,
                        "Mail route changed underneath us, retrying"
                    );
                }
            }
        }

        Err(MailRouteError::ConflictRetriesExhausted { attempts })
    }
}
