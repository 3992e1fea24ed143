//! Environment-driven configuration for the eventsink binary.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use eventsink_core::config::FlushConfig;
use eventsink_core::error::{Error, Result};

const ENV_BASE_DIR: &str = "EVENTSINK_BASE_DIR";
const ENV_ROLL_INTERVAL_MS: &str = "EVENTSINK_ROLL_INTERVAL_MS";
const ENV_SYNC_INTERVAL_MS: &str = "EVENTSINK_SYNC_INTERVAL_MS";
const ENV_SYNC_RECORD_THRESHOLD: &str = "EVENTSINK_SYNC_RECORD_THRESHOLD";
const ENV_RECONNECT_DELAY_MS: &str = "EVENTSINK_RECONNECT_DELAY_MS";
const ENV_HEARTBEAT_INTERVAL_MS: &str = "EVENTSINK_HEARTBEAT_INTERVAL_MS";

const DEFAULT_BASE_DIR: &str = "/var/lib/eventsink";
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) base_dir: PathBuf,
    pub(crate) heartbeat_interval: Duration,
    pub(crate) flush: FlushConfig,
}

impl Settings {
    pub(crate) fn load() -> Result<Self> {
        let defaults = FlushConfig::default();
        let flush = FlushConfig::default()
            .with_roll_interval(duration_ms(ENV_ROLL_INTERVAL_MS, defaults.roll_interval)?)
            .with_sync_interval(duration_ms(ENV_SYNC_INTERVAL_MS, defaults.sync_interval)?)
            .with_sync_record_threshold(count(
                ENV_SYNC_RECORD_THRESHOLD,
                defaults.sync_record_threshold,
            )?)
            .with_reconnect_delay(duration_ms(
                ENV_RECONNECT_DELAY_MS,
                defaults.reconnect_delay,
            )?);
        flush.validate()?;

        Ok(Self {
            base_dir: env::var(ENV_BASE_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_BASE_DIR)),
            heartbeat_interval: duration_ms(ENV_HEARTBEAT_INTERVAL_MS, DEFAULT_HEARTBEAT_INTERVAL)?,
            flush,
        })
    }
}

fn duration_ms(name: &str, default: Duration) -> Result<Duration> {
    match env::var(name) {
        Ok(value) => parse_duration_ms(name, &value),
        Err(_) => Ok(default),
    }
}

fn parse_duration_ms(name: &str, value: &str) -> Result<Duration> {
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| Error::Config(format!("invalid {name}={value}: {e}")))
}

fn count(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(value) => parse_count(name, &value),
        Err(_) => Ok(default),
    }
}

fn parse_count(name: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|e| Error::Config(format!("invalid {name}={value}: {e}")))
}
