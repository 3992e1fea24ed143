//! Durable-file sink core for an event-ingestion pipeline.
//!
//! The [`flusher::FileFlusher`] owns exactly one writable file at a time,
//! syncs and rolls it on policy, degrades to an unavailable state on
//! filesystem failure, and recovers with bounded backoff. Backpressure is
//! expressed to the driving [`forwarder::Forwarder`] purely through the
//! [`processor::Directive`] returned from every call; no error ever escapes
//! the controller.
//!
//! Every controller instance must be driven by a single task: `process`,
//! `heartbeat`, and `cleanup` are never invoked concurrently on the same
//! instance. The receivers (`&mut self` / `self`) enforce this.

pub mod config;
pub mod error;
pub mod filename;
pub mod flusher;
pub mod forwarder;
pub mod manager;
pub mod processor;

pub use self::error::{Error, Result};
