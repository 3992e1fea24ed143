use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_ROLL_INTERVAL: Duration = Duration::from_secs(3600);
const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_SYNC_RECORD_THRESHOLD: u64 = 1000;
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(15);

/// Flush policy for one sink file. All timing is evaluated lazily, on every
/// record and on every heartbeat; there are no internal timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushConfig {
    /// Maximum age of a file before it is rolled, regardless of content.
    pub roll_interval: Duration,
    /// Maximum time appended records may stay unsynced while the file is
    /// receiving traffic.
    pub sync_interval: Duration,
    /// Number of unsynced records that forces a sync irrespective of time.
    pub sync_record_threshold: u64,
    /// Minimum delay between consecutive recovery attempts after a file
    /// system failure.
    pub reconnect_delay: Duration,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            roll_interval: DEFAULT_ROLL_INTERVAL,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            sync_record_threshold: DEFAULT_SYNC_RECORD_THRESHOLD,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl FlushConfig {
    pub fn with_roll_interval(mut self, roll_interval: Duration) -> Self {
        self.roll_interval = roll_interval;
        self
    }

    pub fn with_sync_interval(mut self, sync_interval: Duration) -> Self {
        self.sync_interval = sync_interval;
        self
    }

    pub fn with_sync_record_threshold(mut self, sync_record_threshold: u64) -> Self {
        self.sync_record_threshold = sync_record_threshold;
        self
    }

    pub fn with_reconnect_delay(mut self, reconnect_delay: Duration) -> Self {
        self.reconnect_delay = reconnect_delay;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync_record_threshold == 0 {
            return Err(Error::Config(
                "sync_record_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
