//! Background worker configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkersConfig {
    /// Change feed poll interval in milliseconds
    #[serde(default = "default_change_feed_interval_ms")]
    pub change_feed_interval_ms: u64,

    /// Change records per poll
    #[serde(default = "default_change_feed_batch_size")]
    pub change_feed_batch_size: u32,

    /// Reconciliation sweep interval in seconds
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,

    /// Orders and accounts examined per sweep
    #[serde(default = "default_reconcile_batch_size")]
    pub reconcile_batch_size: u32,

    /// Expiry reaper interval in seconds
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,

    /// Conditional route write retries after a conflict
    #[serde(default = "default_route_conflict_retries")]
    pub route_conflict_retries: u32,

    /// Queued route requests before callers wait
    #[serde(default = "default_route_queue_capacity")]
    pub route_queue_capacity: usize,
}

impl WorkersConfig {
    pub fn change_feed_interval(&self) -> Duration {
        Duration::from_millis(self.change_feed_interval_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.change_feed_interval_ms == 0 || self.change_feed_batch_size == 0 {
            return Err(ValidationError::InvalidWorkerSetting("change_feed"));
        }
        if self.reconcile_interval_secs == 0 || self.reconcile_batch_size == 0 {
            return Err(ValidationError::InvalidWorkerSetting("reconcile"));
        }
        if self.reaper_interval_secs == 0 {
            return Err(ValidationError::InvalidWorkerSetting("reaper"));
        }
        if self.route_queue_capacity == 0 {
            return Err(ValidationError::InvalidWorkerSetting("route_queue_capacity"));
        }
        Ok(())
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            change_feed_interval_ms: default_change_feed_interval_ms(),
            change_feed_batch_size: default_change_feed_batch_size(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            reconcile_batch_size: default_reconcile_batch_size(),
            reaper_interval_secs: default_reaper_interval_secs(),
            route_conflict_retries: default_route_conflict_retries(),
            route_queue_capacity: default_route_queue_capacity(),
        }
    }
}

fn default_change_feed_interval_ms() -> u64 {
    1000
}

fn default_change_feed_batch_size() -> u32 {
    25
}

fn default_reconcile_interval_secs() -> u64 {
    300
}

fn default_reconcile_batch_size() -> u32 {
    100
}

fn default_reaper_interval_secs() -> u64 {
    3600
}

fn default_route_conflict_retries() -> u32 {
    5
}

fn default_route_queue_capacity() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = WorkersConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.change_feed_interval(), Duration::from_secs(1));
        assert_eq!(config.reconcile_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_rejects_zero_batch() {
        let config = WorkersConfig {
            change_feed_batch_size: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidWorkerSetting("change_feed"))
        );
    }
}
