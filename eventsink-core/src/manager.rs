//! Capability traits for the storage backend. The flusher is generic over
//! these, so backends (local disk, remote filesystems) are injected at
//! construction and tests can substitute mocks.

use bytes::Bytes;

use crate::error::Result;

/// One physical sink file. A handle is exclusively owned by the controller
/// for its lifetime and is terminated exactly once: the termination methods
/// consume `self`, so a published or discarded file cannot be touched again.
#[trait_variant::make(EventFile: Send)]
pub trait LocalEventFile {
    /// Append one serialized record. Appended data is not durable until the
    /// next successful [`sync`](LocalEventFile::sync) or
    /// [`close_and_publish`](LocalEventFile::close_and_publish).
    async fn append(&mut self, record: Bytes) -> Result<()>;

    /// Force all appended data to durable storage without closing the file.
    async fn sync(&mut self) -> Result<()>;

    /// Durably finalize the file and atomically make it visible to
    /// downstream consumers. Implies a final sync.
    async fn close_and_publish(self) -> Result<()>;

    /// Remove/abandon the file without ever making it visible.
    async fn discard(self) -> Result<()>;
}

/// Creates sink files by name.
#[trait_variant::make(FileManager: Send)]
pub trait LocalFileManager {
    type File: EventFile;

    /// Create a new, empty, not-yet-published file under the given name.
    async fn create_file(&mut self, name: &str) -> Result<Self::File>;
}
