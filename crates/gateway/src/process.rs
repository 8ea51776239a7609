//! External command execution with a bounded wait.
//!
//! Every interaction with the remote filesystem (and archive extraction for
//! folder uploads) goes through [`run`]. Arguments are passed as a vector, so
//! there is no shell and no quoting. Output is captured in full. A command that
//! outlives its timeout is killed and reported as [`CommandError::Timeout`].

use std::ffi::{OsStr, OsString};
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Errors that can occur while running an external command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The executable could not be started.
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The command exited with a non-zero status.
    #[error("`{command}` exited with status {code}: {stderr}")]
    Failed {
        command: String,
        /// Exit code, or -1 if the process was terminated by a signal.
        code: i32,
        /// Trimmed standard error.
        stderr: String,
    },

    /// The command did not finish within the configured bound.
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// Local I/O failure around the command.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CommandError {
    /// Build a `Failed` error without a real process, for test doubles.
    pub fn failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        CommandError::Failed {
            command: command.into(),
            code: 1,
            stderr: stderr.into(),
        }
    }
}

/// Captured result of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Render a command line for logs and error messages.
pub fn describe(program: &str, args: &[OsString]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Run `program` with `args`, waiting at most `timeout`.
///
/// A non-zero exit is not an error here; callers decide what a failed status
/// means (an existence test, for instance, reports `false` that way).
pub async fn run<I, S>(program: &str, args: I, timeout: Duration) -> Result<CommandOutput, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    let command = describe(program, &args);
    debug!(command = %command, "Running external command");

    let child = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CommandError::Spawn {
            command: command.clone(),
            source,
        })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(command = %command, ?timeout, "External command timed out");
            return Err(CommandError::Timeout { command, timeout });
        }
    };

    Ok(CommandOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Like [`run`], but a non-zero exit becomes [`CommandError::Failed`].
pub async fn run_checked<I, S>(
    program: &str,
    args: I,
    timeout: Duration,
) -> Result<CommandOutput, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    let output = run(program, &args, timeout).await?;

    if !output.success() {
        let stderr = output.stderr.trim().to_string();
        let command = describe(program, &args);
        warn!(command = %command, stderr = %stderr, "External command failed");
        return Err(CommandError::Failed {
            command,
            code: output.status.code().unwrap_or(-1),
            stderr,
        });
    }

    Ok(output)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn test_run_captures_output() {
        let output = run("sh", ["-c", "echo out; echo err >&2"], TIMEOUT)
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_run_non_zero_is_not_an_error() {
        let output = run("sh", ["-c", "exit 1"], TIMEOUT).await.unwrap();
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_run_checked_maps_failure() {
        let err = run_checked("sh", ["-c", "echo 'No such file' >&2; exit 3"], TIMEOUT)
            .await
            .unwrap_err();

        match err {
            CommandError::Failed {
                command,
                code,
                stderr,
            } => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(code, 3);
                assert_eq!(stderr, "No such file");
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let err = run("definitely_not_a_real_binary_xyz", ["x"], TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let err = run("sleep", ["5"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }

    #[test]
    fn test_describe() {
        let args = vec![OsString::from("dfs"), OsString::from("-ls"), OsString::from("/a b")];
        assert_eq!(describe("hdfs", &args), "hdfs dfs -ls /a b");
    }
}
