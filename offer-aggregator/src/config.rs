use crate::types::{AggregatorError, Result, UNKNOWN_REMAINING_SECONDS};
use std::time::Duration;

/// Timing knobs of the tracker. All values are in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub poll_interval_secs: u64,
    pub urgent_threshold_secs: i64,
    pub favorite_threshold_secs: i64,
    pub fetch_timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 180,
            urgent_threshold_secs: 43_200,   // 12 hours
            favorite_threshold_secs: 10_800, // 3 hours
            fetch_timeout_secs: 15,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(AggregatorError::Config("poll interval must be positive".to_string()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(AggregatorError::Config("fetch timeout must be positive".to_string()));
        }
        for (name, value) in [
            ("urgent threshold", self.urgent_threshold_secs),
            ("favorite threshold", self.favorite_threshold_secs),
        ] {
            // Offers with an unknown end time must never cross a threshold.
            if value <= 0 || value >= UNKNOWN_REMAINING_SECONDS {
                return Err(AggregatorError::Config(format!(
                    "{} must be between 1 and {} seconds, got {}",
                    name,
                    UNKNOWN_REMAINING_SECONDS - 1,
                    value
                )));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
