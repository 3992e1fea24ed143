//! The item-processing capability exposed to the scheduler.

use bytes::Bytes;

/// Per-call instruction to the caller. `Pause` means: stop submitting
/// records until a later `heartbeat` returns `Continue`. This is the only
/// backpressure/failure signal the processor emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Keep sending work.
    Continue,
    /// Stop sending work until told otherwise.
    Pause,
}

/// A processor driven by a single task: one record at a time, periodic
/// heartbeats on idle ticks, and exactly one cleanup at shutdown (enforced
/// by the `self` receiver).
///
/// Callers must honor the [`Directive`] contract: after observing `Pause`
/// from any call, no further `process` calls may be made until a subsequent
/// `heartbeat` returns `Continue`.
#[trait_variant::make(ItemProcessor: Send)]
pub trait LocalItemProcessor {
    /// Handle one serialized record.
    async fn process(&mut self, record: Bytes) -> Directive;

    /// Periodic content-free tick; applies time-based policy and drives
    /// recovery. Invoked regardless of the current directive state.
    async fn heartbeat(&mut self) -> Directive;

    /// Final shutdown hook. Must not fail or hang; errors are logged.
    async fn cleanup(self);
}
