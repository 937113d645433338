//! Background workers.
//!
//! Each worker owns a poll loop and stops when the shared shutdown watch
//! channel flips to `true`.

mod change_feed_poller;
mod periodic;

pub use change_feed_poller::{ChangeFeedPoller, ChangeFeedPollerConfig, PollSummary};
pub use periodic::{PeriodicJob, PeriodicWorker};
