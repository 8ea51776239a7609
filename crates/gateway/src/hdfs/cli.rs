//! [`RemoteFs`] implementation backed by the `hdfs` command-line client.
//!
//! Each operation maps to one `hdfs dfs` (or `hdfs dfsadmin`) subcommand.
//! Exit status decides success; stderr is carried in the error for logging.

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use protocol::{parse_listing, DirectoryEntry};
use tracing::debug;

use super::{HdfsResult, RemoteFs};
use crate::config::HdfsConfig;
use crate::process::{run, run_checked};

/// Remote filesystem client that shells out to `hdfs`.
#[derive(Debug, Clone)]
pub struct HdfsCli {
    /// The `hdfs` executable.
    bin: String,
    /// Bound on each invocation.
    timeout: Duration,
}

impl HdfsCli {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    pub fn from_config(config: &HdfsConfig) -> Self {
        Self::new(config.hdfs_bin.clone(), config.command_timeout())
    }

    /// Run `hdfs dfs -test <flag> <path>`; exit 0 means true.
    async fn test(&self, flag: &str, path: &str) -> HdfsResult<bool> {
        let output = run(&self.bin, ["dfs", "-test", flag, path], self.timeout).await?;
        Ok(output.success())
    }

    /// Run an `hdfs dfs` subcommand and require a zero exit.
    async fn dfs<I, S>(&self, args: I) -> HdfsResult<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args = std::iter::once(OsStr::new("dfs").to_os_string())
            .chain(args.into_iter().map(|a| a.as_ref().to_os_string()));
        let output = run_checked(&self.bin, args, self.timeout).await?;
        Ok(output.stdout)
    }
}

#[async_trait::async_trait]
impl RemoteFs for HdfsCli {
    async fn exists(&self, path: &str) -> HdfsResult<bool> {
        self.test("-e", path).await
    }

    async fn is_dir(&self, path: &str) -> HdfsResult<bool> {
        self.test("-d", path).await
    }

    async fn list(&self, path: &str) -> HdfsResult<Vec<DirectoryEntry>> {
        let stdout = self.dfs(["-ls", path]).await?;
        let entries = parse_listing(&stdout);
        debug!(path = %path, count = entries.len(), "Listed remote directory");
        Ok(entries)
    }

    async fn mkdir(&self, path: &str) -> HdfsResult<()> {
        self.dfs(["-mkdir", "-p", path]).await.map(drop)
    }

    async fn remove(&self, path: &str) -> HdfsResult<()> {
        self.dfs(["-rm", "-r", path]).await.map(drop)
    }

    async fn rename(&self, from: &str, to: &str) -> HdfsResult<()> {
        self.dfs(["-mv", from, to]).await.map(drop)
    }

    async fn put(&self, local: &Path, remote: &str) -> HdfsResult<()> {
        self.dfs([
            OsStr::new("-put"),
            OsStr::new("-f"),
            local.as_os_str(),
            OsStr::new(remote),
        ])
        .await
        .map(drop)
    }

    async fn get(&self, remote: &str, local: &Path) -> HdfsResult<()> {
        self.dfs([
            OsStr::new("-get"),
            OsStr::new("-f"),
            OsStr::new(remote),
            local.as_os_str(),
        ])
        .await
        .map(drop)
    }

    async fn leave_safe_mode(&self) -> HdfsResult<()> {
        run_checked(&self.bin, ["dfsadmin", "-safemode", "leave"], self.timeout)
            .await
            .map(drop)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::process::CommandError;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// A stand-in `hdfs` script. Every call is appended to `calls.log` next to it.
    const FAKE_HDFS: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/calls.log"
if [ "$1" = "dfsadmin" ]; then
  [ "$2" = "-safemode" ] && [ "$3" = "leave" ] && echo "Safe mode is OFF" && exit 0
  exit 1
fi
case "$2" in
  -test)
    [ "$4" = "/dir" ] && exit 0
    [ "$3" = "-e" ] && [ "$4" = "/file" ] && exit 0
    exit 1 ;;
  -ls)
    echo "Found 2 items"
    echo "drwxr-xr-x   - hdfs supergroup          0 2024-01-01 10:00 $3/dir1"
    echo "-rw-r--r--   3 hdfs supergroup       1024 2024-01-01 10:05 $3/my file.txt"
    exit 0 ;;
  -mkdir)
    echo "mkdir: Permission denied: user=web" >&2
    exit 1 ;;
  -mv)
    sleep 5 ;;
  -get)
    printf 'payload' > "$5"
    exit 0 ;;
  *)
    exit 0 ;;
esac
"#;

    fn fake_hdfs() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("hdfs");
        fs::write(&bin, FAKE_HDFS).unwrap();
        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();
        (dir, bin)
    }

    fn client(bin: &Path) -> HdfsCli {
        HdfsCli::new(bin.to_string_lossy(), Duration::from_secs(10))
    }

    fn calls(dir: &TempDir) -> String {
        fs::read_to_string(dir.path().join("calls.log")).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_exists_and_is_dir() {
        let (_dir, bin) = fake_hdfs();
        let hdfs = client(&bin);

        assert!(hdfs.exists("/dir").await.unwrap());
        assert!(hdfs.exists("/file").await.unwrap());
        assert!(!hdfs.exists("/missing").await.unwrap());

        assert!(hdfs.is_dir("/dir").await.unwrap());
        assert!(!hdfs.is_dir("/file").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_parses_output() {
        let (_dir, bin) = fake_hdfs();
        let entries = client(&bin).list("/base").await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "/base/dir1");
        assert!(entries[0].is_dir());
        assert_eq!(entries[1].name, "my file.txt");
        assert_eq!(entries[1].size, "1024");
    }

    #[tokio::test]
    async fn test_mkdir_failure_carries_stderr() {
        let (_dir, bin) = fake_hdfs();
        let err = client(&bin).mkdir("/locked").await.unwrap_err();

        match err {
            CommandError::Failed { stderr, code, .. } => {
                assert_eq!(code, 1);
                assert!(stderr.contains("Permission denied"));
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_argument_vectors() {
        let (dir, bin) = fake_hdfs();
        let hdfs = client(&bin);

        hdfs.remove("/old data").await.unwrap();
        hdfs.put(Path::new("/tmp/local.bin"), "/remote/local.bin")
            .await
            .unwrap();

        let log = calls(&dir);
        assert!(log.contains("dfs -rm -r /old data"));
        assert!(log.contains("dfs -put -f /tmp/local.bin /remote/local.bin"));
    }

    #[tokio::test]
    async fn test_get_writes_local_file() {
        let (dir, bin) = fake_hdfs();
        let local = dir.path().join("out.bin");

        client(&bin).get("/remote/file", &local).await.unwrap();

        assert_eq!(fs::read_to_string(&local).unwrap(), "payload");
        assert!(calls(&dir).contains("dfs -get -f /remote/file"));
    }

    #[tokio::test]
    async fn test_leave_safe_mode_uses_dfsadmin() {
        let (dir, bin) = fake_hdfs();
        client(&bin).leave_safe_mode().await.unwrap();
        assert!(calls(&dir).contains("dfsadmin -safemode leave"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let (_dir, bin) = fake_hdfs();
        let hdfs = HdfsCli::new(bin.to_string_lossy(), Duration::from_millis(200));

        let err = hdfs.rename("/a", "/b").await.unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let hdfs = HdfsCli::new("/nonexistent/bin/hdfs", Duration::from_secs(1));
        let err = hdfs.exists("/x").await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
