//! PeriodicWorker - runs a maintenance job on a fixed interval.
//!
//! Used for the reconciliation sweep and the expiry reaper. Both jobs are
//! idempotent, so a tick that overlaps with a request handler or another
//! instance is harmless.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time;

use crate::application::{ExpiryReaper, ReconciliationSweep};
use crate::domain::foundation::{DomainError, Timestamp};

/// A unit of periodic work.
#[async_trait]
pub trait PeriodicJob: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs once; returns how many items were acted on.
    async fn run_once(&self, now: Timestamp) -> Result<usize, DomainError>;
}

#[async_trait]
impl PeriodicJob for ReconciliationSweep {
    fn name(&self) -> &'static str {
        "reconciliation_sweep"
    }

    async fn run_once(&self, _now: Timestamp) -> Result<usize, DomainError> {
        let report = ReconciliationSweep::run_once(self).await?;
        Ok(report.provisioned + report.deactivated)
    }
}

#[async_trait]
impl PeriodicJob for ExpiryReaper {
    fn name(&self) -> &'static str {
        "expiry_reaper"
    }

    async fn run_once(&self, now: Timestamp) -> Result<usize, DomainError> {
        ExpiryReaper::run_once(self, now).await
    }
}

pub struct PeriodicWorker {
    job: Arc<dyn PeriodicJob>,
    interval: Duration,
}

impl PeriodicWorker {
    pub fn new(job: Arc<dyn PeriodicJob>, interval: Duration) -> Self {
        Self { job, interval }
    }

    /// Runs until the shutdown signal flips to `true`. Job failures are
    /// logged and retried on the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!(job = self.job.name(), "Periodic worker stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.tick(Timestamp::now()).await;
                }
            }
        }
    }

    pub async fn tick(&self, now: Timestamp) -> usize {
        match self.job.run_once(now).await {
            Ok(count) => {
                if count > 0 {
                    tracing::info!(job = self.job.name(), count, "Periodic job acted");
                }
                count
            }
            Err(e) => {
                tracing::error!(job = self.job.name(), error = %e, "Periodic job failed");
                0
            }
        }
    }
}
