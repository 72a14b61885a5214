//! The process-execution boundary.
//!
//! The pipeline never inspects a process beyond the exit status, stdout and
//! stderr that a [`ProcessExecutor`] hands back.

mod detection;
mod shell;

pub use detection::{detect, Detection};
pub use shell::ShellExecutor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A fully rendered command ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    /// Shell command line.
    pub command: String,
    /// Directory the command runs in.
    pub working_dir: PathBuf,
    /// Limit enforced by the caller; executors may use it as a hint.
    pub timeout: Option<Duration>,
}

impl ProcessInvocation {
    /// Creates an invocation without a timeout.
    #[must_use]
    pub fn new(command: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.into(),
            timeout: None,
        }
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// What a finished process reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ProcessOutput {
    /// Creates an output with the given exit code and streams.
    #[must_use]
    pub fn new(exit_code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// A zero-exit output with the given stdout.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::new(Some(0), stdout, "")
    }

    /// A nonzero-exit output with the given stderr.
    #[must_use]
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::new(Some(exit_code), "", stderr)
    }

    /// Returns true if the process exited with status zero.
    #[must_use]
    pub fn is_zero_exit(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Returns stdout followed by stderr, separated by a newline when both
    /// are present.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.trim_end().is_empty(), self.stderr.trim_end().is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
        }
    }
}

/// Errors raised by the process boundary itself.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The process could not be spawned.
    #[error("failed to launch '{command}': {source}")]
    Spawn {
        /// The command that failed.
        command: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Runs external commands.
///
/// Implementations must be cancel-safe: dropping the returned future must
/// terminate the underlying process.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Runs the command and captures its exit status and output.
    async fn execute(&self, invocation: &ProcessInvocation) -> Result<ProcessOutput, ProcessError>;
}
