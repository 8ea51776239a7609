//! Remote filesystem access.
//!
//! All remote state is reached through the [`RemoteFs`] trait, one method per
//! operation the gateway performs. [`HdfsCli`] implements it by invoking the
//! `hdfs` command-line client; [`MemoryFs`] is an in-process double used by
//! tests.

pub mod cli;
pub mod memory;

use std::path::Path;

use protocol::DirectoryEntry;

pub use crate::process::CommandError;
pub use cli::HdfsCli;
pub use memory::MemoryFs;

/// Result type for remote filesystem operations.
pub type HdfsResult<T> = Result<T, CommandError>;

/// Trait for remote filesystem operations.
///
/// Existence tests report a missing path as `Ok(false)`. Every other method
/// reports a failed operation as `Err`. Uses `#[async_trait]` so the handlers
/// can hold an `Arc<dyn RemoteFs>`.
#[async_trait::async_trait]
pub trait RemoteFs: Send + Sync {
    /// Whether `path` exists (file or directory).
    async fn exists(&self, path: &str) -> HdfsResult<bool>;

    /// Whether `path` exists and is a directory.
    async fn is_dir(&self, path: &str) -> HdfsResult<bool>;

    /// List the immediate children of `path`.
    async fn list(&self, path: &str) -> HdfsResult<Vec<DirectoryEntry>>;

    /// Create `path` and any missing parents.
    async fn mkdir(&self, path: &str) -> HdfsResult<()>;

    /// Remove `path` recursively.
    async fn remove(&self, path: &str) -> HdfsResult<()>;

    /// Move `from` to `to`.
    async fn rename(&self, from: &str, to: &str) -> HdfsResult<()>;

    /// Copy a local file or directory to `remote`, overwriting.
    async fn put(&self, local: &Path, remote: &str) -> HdfsResult<()>;

    /// Copy `remote` to a local path, overwriting.
    async fn get(&self, remote: &str, local: &Path) -> HdfsResult<()>;

    /// Take the namenode out of safe mode.
    async fn leave_safe_mode(&self) -> HdfsResult<()>;
}
