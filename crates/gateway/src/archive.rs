//! Archive extraction for folder uploads.
//!
//! A folder arrives as a zip file. It is unpacked into a request-scoped
//! temporary directory before its contents are copied to the remote
//! filesystem.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::process::{run_checked, CommandError};

/// Trait for unpacking an uploaded archive.
#[async_trait::async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Unpack `archive` into the existing directory `dest`.
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), CommandError>;
}

/// Extractor that invokes the `unzip` executable.
#[derive(Debug, Clone)]
pub struct UnzipCommand {
    bin: String,
    timeout: Duration,
}

impl UnzipCommand {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl ArchiveExtractor for UnzipCommand {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), CommandError> {
        run_checked(
            &self.bin,
            [
                OsStr::new("-q"),
                OsStr::new("-o"),
                archive.as_os_str(),
                OsStr::new("-d"),
                dest.as_os_str(),
            ],
            self.timeout,
        )
        .await?;
        debug!(archive = %archive.display(), dest = %dest.display(), "Archive extracted");
        Ok(())
    }
}

/// Top-level entries of an extracted archive, sorted by name.
pub async fn top_level_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}
