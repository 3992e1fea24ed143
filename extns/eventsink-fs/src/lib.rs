//! Local-filesystem backend for the eventsink flush controller.
//!
//! Files are written under `<base>/<name>.inflight` and atomically renamed to
//! `<base>/<name>` on publish; downstream consumers must treat the rename as
//! the sole "file is complete" signal and ignore anything with the
//! `.inflight` suffix. A failed publish leaves the in-flight file behind for
//! operator inspection; it is never visible to consumers.
//!
//! Records are framed as a little-endian `u64` length prefix followed by the
//! payload.

use std::path::PathBuf;

use bytes::Bytes;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use eventsink_core::Result;
use eventsink_core::manager::{EventFile, FileManager};

const INFLIGHT_SUFFIX: &str = "inflight";

/// Creates sink files under a single base directory.
pub struct FsFileManager {
    base_dir: PathBuf,
}

impl FsFileManager {
    /// Creates the base directory if it does not exist yet.
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }
}

impl FileManager for FsFileManager {
    type File = FsFile;

    async fn create_file(&mut self, name: &str) -> Result<Self::File> {
        let published_path = self.base_dir.join(name);
        let inflight_path = self.base_dir.join(format!("{name}.{INFLIGHT_SUFFIX}"));
        // create_new: a name collision is an error, never an overwrite.
        let file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&inflight_path)
            .await?;
        debug!(path = %inflight_path.display(), "Opened in-flight sink file");
        Ok(FsFile {
            writer: BufWriter::new(file),
            inflight_path,
            published_path,
        })
    }
}

/// One in-flight sink file on the local filesystem.
pub struct FsFile {
    writer: BufWriter<File>,
    inflight_path: PathBuf,
    published_path: PathBuf,
}

impl EventFile for FsFile {
    async fn append(&mut self, record: Bytes) -> Result<()> {
        self.writer.write_u64_le(record.len() as u64).await?;
        self.writer.write_all(&record).await?;
        Ok(())
    }

    async fn sync(&mut self) -> Result<()> {
        self.writer.flush().await?;
        self.writer.get_ref().sync_data().await?;
        Ok(())
    }

    async fn close_and_publish(mut self) -> Result<()> {
        self.writer.flush().await?;
        self.writer.get_ref().sync_all().await?;
        tokio::fs::rename(&self.inflight_path, &self.published_path).await?;
        debug!(path = %self.published_path.display(), "Published sink file");
        Ok(())
    }

    async fn discard(self) -> Result<()> {
        drop(self.writer);
        tokio::fs::remove_file(&self.inflight_path).await?;
        debug!(path = %self.inflight_path.display(), "Discarded in-flight sink file");
        Ok(())
    }
}
