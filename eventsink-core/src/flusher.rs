//! The flush controller: owns at most one writable sink file, applies the
//! sync/roll policy on every record and heartbeat, degrades on I/O failure,
//! and recovers with bounded backoff.
//!
//! All policy timing uses the monotonic [`tokio::time::Instant`] so tests
//! can drive every boundary exactly under a paused runtime clock; wall-clock
//! time appears only in file names.

use std::mem;

use bytes::Bytes;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::FlushConfig;
use crate::error::{Error, Result};
use crate::filename;
use crate::manager::{EventFile, FileManager};
use crate::processor::{Directive, ItemProcessor};

/// A file handle as held by the controller. `Poisoned` is the sentinel
/// installed when the very first file cannot be created: every operation
/// replays the stored construction error, so the first `process` call drives
/// the controller into the ordinary failure/backoff path and the hot path
/// needs no special first-call branch.
enum FileState<F> {
    Open(F),
    Poisoned(Error),
}

impl<F: EventFile> FileState<F> {
    async fn append(&mut self, record: Bytes) -> Result<()> {
        match self {
            FileState::Open(file) => file.append(record).await,
            FileState::Poisoned(err) => Err(err.clone()),
        }
    }

    async fn sync(&mut self) -> Result<()> {
        match self {
            FileState::Open(file) => file.sync().await,
            FileState::Poisoned(err) => Err(err.clone()),
        }
    }

    async fn close_and_publish(self) -> Result<()> {
        match self {
            FileState::Open(file) => file.close_and_publish().await,
            FileState::Poisoned(err) => Err(err),
        }
    }

    async fn discard(self) -> Result<()> {
        match self {
            FileState::Open(file) => file.discard().await,
            FileState::Poisoned(err) => Err(err),
        }
    }
}

/// Bookkeeping for the one file currently owned by the controller.
struct TrackedFile<F> {
    handle: FileState<F>,
    /// Deadline after which the file is rolled regardless of content.
    roll_deadline: Instant,
    /// Time of the most recent successful sync (or idle reset).
    last_sync_at: Instant,
    /// Records appended since the last successful sync.
    records_since_sync: u64,
    /// Records durably synced into this file so far.
    total_records: u64,
}

impl<F> TrackedFile<F> {
    fn new(handle: FileState<F>, opened_at: Instant, config: &FlushConfig) -> Self {
        Self {
            handle,
            roll_deadline: opened_at + config.roll_interval,
            last_sync_at: opened_at,
            records_since_sync: 0,
            total_records: 0,
        }
    }

    /// True if the file ever held a record, synced or still pending.
    fn has_records(&self) -> bool {
        self.total_records + self.records_since_sync > 0
    }
}

/// Controller health. Exactly one of {current file, last attempt timestamp}
/// is meaningful at a time; while `Unavailable` no record may be appended.
enum Health<F> {
    Available(TrackedFile<F>),
    Unavailable { last_attempt_at: Instant },
}

/// The flush controller. Generic over the injected [`FileManager`] backend.
///
/// Must be driven by a single task; `process`/`heartbeat`/`cleanup` are never
/// invoked concurrently on one instance, so there is no internal locking.
pub struct FileFlusher<M: FileManager> {
    config: FlushConfig,
    manager: M,
    instance: u32,
    health: Health<M::File>,
}

impl<M: FileManager> FileFlusher<M> {
    /// Creates the controller and its first sink file. Never fails: if the
    /// first file cannot be created, a poisoned handle is installed and the
    /// error surfaces as a `Pause` on the first `process` call.
    pub async fn new(config: FlushConfig, mut manager: M) -> Self {
        let instance = filename::next_instance_number();
        let now = Instant::now();
        let name = filename::generate(instance);
        let handle = match manager.create_file(&name).await {
            Ok(file) => {
                info!(file = %name, instance, "Opened initial sink file");
                FileState::Open(file)
            }
            Err(err) => {
                error!(%err, file = %name, instance, "Failed to create initial sink file, deferring failure to first record");
                FileState::Poisoned(err)
            }
        };
        let tracked = TrackedFile::new(handle, now, &config);
        Self {
            config,
            manager,
            instance,
            health: Health::Available(tracked),
        }
    }

    async fn append_record(&mut self, record: Bytes) -> Result<()> {
        let Health::Available(file) = &mut self.health else {
            // process() rejects the unavailable state before calling here.
            unreachable!("append on unavailable flusher");
        };
        file.handle.append(record).await?;
        file.records_since_sync += 1;
        self.apply_policy().await
    }

    /// The sync/roll policy, applied identically from `process` and
    /// `heartbeat`. Roll takes priority over sync.
    async fn apply_policy(&mut self) -> Result<()> {
        let now = Instant::now();
        let roll_due = match &self.health {
            Health::Available(file) => now > file.roll_deadline,
            Health::Unavailable { .. } => unreachable!("policy on unavailable flusher"),
        };
        if roll_due {
            return self.roll(now).await;
        }

        let Health::Available(file) = &mut self.health else {
            unreachable!("policy on unavailable flusher");
        };
        let sync_due = file.records_since_sync >= self.config.sync_record_threshold
            || (now.duration_since(file.last_sync_at) >= self.config.sync_interval
                && file.records_since_sync > 0);
        if sync_due {
            file.handle.sync().await?;
            file.total_records += file.records_since_sync;
            file.records_since_sync = 0;
            file.last_sync_at = now;
        } else if file.records_since_sync == 0 {
            // Keep last_sync_at fresh while idle so the first record after a
            // quiet period does not immediately trip the time-based sync.
            file.last_sync_at = now;
        }
        Ok(())
    }

    /// Terminates the current file (publish if it ever synced a record,
    /// discard if empty) and opens a fresh one. The old handle is moved out
    /// of the health state before termination, so a mid-roll failure cannot
    /// terminate it a second time on the failure path.
    async fn roll(&mut self, now: Instant) -> Result<()> {
        let old = match mem::replace(
            &mut self.health,
            Health::Unavailable {
                last_attempt_at: now,
            },
        ) {
            Health::Available(file) => file,
            Health::Unavailable { .. } => unreachable!("roll on unavailable flusher"),
        };
        if old.total_records > 0 {
            info!(
                records = old.total_records,
                "Rolling sink file, publishing"
            );
            old.handle.close_and_publish().await?;
        } else {
            info!("Rolling empty sink file, discarding");
            old.handle.discard().await?;
        }
        self.open_new_file(now).await
    }

    /// Creates a fresh file and installs it as the current tracked file.
    async fn open_new_file(&mut self, now: Instant) -> Result<()> {
        let name = filename::generate(self.instance);
        let file = self.manager.create_file(&name).await?;
        info!(file = %name, "Opened new sink file");
        self.health = Health::Available(TrackedFile::new(
            FileState::Open(file),
            now,
            &self.config,
        ));
        Ok(())
    }

    /// Degrades to `Unavailable`: records the failure time and best-effort
    /// discards the broken file if one is still installed. Discard failures
    /// are swallowed so they never mask the primary failure.
    async fn degrade(&mut self, err: Error) {
        let now = Instant::now();
        error!(%err, reconnect_delay = ?self.config.reconnect_delay, "Sink file system failure, pausing writes");
        let previous = mem::replace(
            &mut self.health,
            Health::Unavailable {
                last_attempt_at: now,
            },
        );
        if let Health::Available(file) = previous {
            if let Err(discard_err) = file.handle.discard().await {
                warn!(%discard_err, "Failed to discard broken sink file");
            }
        }
    }

    /// One recovery attempt: create a fresh file. On failure the backoff
    /// window restarts from now.
    async fn attempt_recovery(&mut self, now: Instant) -> Directive {
        info!("Attempting sink file system recovery");
        match self.open_new_file(now).await {
            Ok(()) => {
                info!("Sink recovered, resuming writes");
                Directive::Continue
            }
            Err(err) => {
                error!(%err, reconnect_delay = ?self.config.reconnect_delay, "Sink recovery attempt failed");
                self.health = Health::Unavailable {
                    last_attempt_at: now,
                };
                Directive::Pause
            }
        }
    }
}

impl<M: FileManager> ItemProcessor for FileFlusher<M> {
    async fn process(&mut self, record: Bytes) -> Directive {
        if matches!(self.health, Health::Unavailable { .. }) {
            // Not an I/O condition: the caller broke the pause contract.
            panic!(
                "record submitted while the flusher is unavailable; the caller must stop after a Pause directive until a heartbeat returns Continue"
            );
        }
        match self.append_record(record).await {
            Ok(()) => Directive::Continue,
            Err(err) => {
                self.degrade(err).await;
                Directive::Pause
            }
        }
    }

    async fn heartbeat(&mut self) -> Directive {
        match &self.health {
            Health::Available(_) => match self.apply_policy().await {
                Ok(()) => Directive::Continue,
                Err(err) => {
                    self.degrade(err).await;
                    Directive::Pause
                }
            },
            Health::Unavailable { last_attempt_at } => {
                let now = Instant::now();
                if now.duration_since(*last_attempt_at) >= self.config.reconnect_delay {
                    self.attempt_recovery(now).await
                } else {
                    Directive::Pause
                }
            }
        }
    }

    async fn cleanup(self) {
        match self.health {
            Health::Available(file) => {
                if file.has_records() {
                    match file.handle.close_and_publish().await {
                        Ok(()) => info!("Published final sink file on shutdown"),
                        Err(err) => error!(%err, "Failed to publish final sink file on shutdown"),
                    }
                } else {
                    match file.handle.discard().await {
                        Ok(()) => info!("Discarded empty sink file on shutdown"),
                        Err(err) => error!(%err, "Failed to discard empty sink file on shutdown"),
                    }
                }
            }
            Health::Unavailable { .. } => {
                info!("Shutdown with no open sink file");
            }
        }
    }
}
