//! ChangeFeedPoller - background service that drains the account change feed.
//!
//! Pulls pending change records, hands them to the
//! [`AccountChangeProcessor`] and acknowledges the ones it finished or
//! dead-lettered. Failed records stay in the feed and come back next poll.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 1s | How often to check for pending records |
//! | `batch_size` | 25 | Max records per poll cycle |
//!
//! ## Graceful Shutdown
//!
//! On shutdown the current batch finishes and one final batch is drained
//! before the loop exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::application::AccountChangeProcessor;
use crate::domain::foundation::DomainError;
use crate::ports::ChangeFeed;

#[derive(Debug, Clone)]
pub struct ChangeFeedPollerConfig {
    pub poll_interval: Duration,
    pub batch_size: u32,
}

impl Default for ChangeFeedPollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 25,
        }
    }
}

impl ChangeFeedPollerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }
}

/// Summary of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub acknowledged: usize,
    pub failed: usize,
}

pub struct ChangeFeedPoller {
    feed: Arc<dyn ChangeFeed>,
    processor: Arc<AccountChangeProcessor>,
    config: ChangeFeedPollerConfig,
}

impl ChangeFeedPoller {
    pub fn new(feed: Arc<dyn ChangeFeed>, processor: Arc<AccountChangeProcessor>) -> Self {
        Self::with_config(feed, processor, ChangeFeedPollerConfig::default())
    }

    pub fn with_config(
        feed: Arc<dyn ChangeFeed>,
        processor: Arc<AccountChangeProcessor>,
        config: ChangeFeedPollerConfig,
    ) -> Self {
        Self {
            feed,
            processor,
            config,
        }
    }

    /// Runs until the shutdown signal flips to `true`.
    ///
    /// Feed errors are logged and retried on the next tick; they never end
    /// the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        if let Err(e) = self.poll_once().await {
                            tracing::error!(error = %e, "Final change feed poll failed");
                        }
                        tracing::info!("Change feed poller stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    if let Err(e) = self.poll_once().await {
                        tracing::error!(error = %e, "Change feed poll failed");
                    }
                }
            }
        }
    }

    /// One poll cycle: fetch, process, acknowledge.
    pub async fn poll_once(&self) -> Result<PollSummary, DomainError> {
        let batch = self.feed.pending(self.config.batch_size).await?;
        if batch.is_empty() {
            return Ok(PollSummary::default());
        }

        let report = self.processor.process_batch(&batch).await;
        let mut summary = PollSummary {
            acknowledged: 0,
            failed: report.failed(),
        };
        for sequence in report.acknowledgeable() {
            self.feed.acknowledge(sequence).await?;
            summary.acknowledged += 1;
        }

        tracing::debug!(
            fetched = batch.len(),
            acknowledged = summary.acknowledged,
            failed = summary.failed,
            "Change feed batch processed"
        );
        Ok(summary)
    }
}
