//! Shell-backed process executor.

use super::{ProcessError, ProcessExecutor, ProcessInvocation, ProcessOutput};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs commands through the platform shell (`sh -c` or `cmd /C`).
///
/// Children are spawned with `kill_on_drop`, so a caller that drops the
/// future on timeout or cancellation terminates the process.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
    flag: String,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        if cfg!(windows) {
            Self::new("cmd", "/C")
        } else {
            Self::new("sh", "-c")
        }
    }
}

impl ShellExecutor {
    /// Creates an executor using a specific shell and command flag.
    #[must_use]
    pub fn new(shell: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            flag: flag.into(),
        }
    }
}

#[async_trait]
impl ProcessExecutor for ShellExecutor {
    async fn execute(&self, invocation: &ProcessInvocation) -> Result<ProcessOutput, ProcessError> {
        debug!(
            command = %invocation.command,
            cwd = %invocation.working_dir.display(),
            "Spawning process"
        );

        let output = Command::new(&self.shell)
            .arg(&self.flag)
            .arg(&invocation.command)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProcessError::Spawn {
                command: invocation.command.clone(),
                source,
            })?;

        let result = ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!(exit_code = ?result.exit_code, "Process finished");
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let executor = ShellExecutor::default();
        let dir = tempfile::tempdir().unwrap();
        let output = executor
            .execute(&ProcessInvocation::new("echo hello", dir.path()))
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_captures_stderr_and_nonzero_exit() {
        let executor = ShellExecutor::default();
        let dir = tempfile::tempdir().unwrap();
        let output = executor
            .execute(&ProcessInvocation::new("echo oops >&2; exit 3", dir.path()))
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let executor = ShellExecutor::default();
        let dir = tempfile::tempdir().unwrap();
        executor
            .execute(&ProcessInvocation::new("echo x > marker.txt", dir.path()))
            .await
            .unwrap();

        assert!(dir.path().join("marker.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_shell_is_spawn_error() {
        let executor = ShellExecutor::new("/no/such/shell", "-c");
        let dir = tempfile::tempdir().unwrap();
        let err = executor
            .execute(&ProcessInvocation::new("true", dir.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_dropped_future_stops_waiting() {
        let executor = ShellExecutor::default();
        let dir = tempfile::tempdir().unwrap();
        let invocation = ProcessInvocation::new("sleep 30", dir.path());

        let result =
            tokio::time::timeout(Duration::from_millis(200), executor.execute(&invocation)).await;
        assert!(result.is_err());
    }
}
