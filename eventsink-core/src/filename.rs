//! Deterministic sink file naming and process-wide instance identity.
//!
//! Names follow the fixed template
//! `<yyyyMMddHHmmss>-eventsink-<host>-<instance>.events`; operational tooling
//! globs these files, so the template must stay stable.

use std::env;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;

const PRODUCT_TAG: &str = "eventsink";
const FILE_EXTENSION: &str = "events";
const DEFAULT_HOST_NAME: &str = "localhost";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

static HOST_NAME: OnceLock<String> = OnceLock::new();

/// Host identity, resolved once per process from the `HOSTNAME` environment
/// variable (container convention), falling back to `localhost`.
pub fn host_name() -> &'static str {
    HOST_NAME.get_or_init(|| {
        env::var("HOSTNAME")
            .ok()
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST_NAME.to_string())
    })
}

static INSTANCE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Next process-wide instance number, starting at 1. Assigned once per
/// flusher instance to disambiguate files from concurrent instances.
pub fn next_instance_number() -> u32 {
    INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

/// Generates a fresh file name from the current UTC wall-clock time, the
/// host identity, and the given instance number.
pub fn generate(instance: u32) -> String {
    format!(
        "{}-{}-{}-{}.{}",
        Utc::now().format(TIMESTAMP_FORMAT),
        PRODUCT_TAG,
        host_name(),
        instance,
        FILE_EXTENSION
    )
}
