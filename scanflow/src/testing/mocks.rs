//! Scripted process executor for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::Duration;

use crate::process::{ProcessError, ProcessExecutor, ProcessInvocation, ProcessOutput};

/// What a scripted command does when invoked.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    /// Output returned to the runner.
    pub output: ProcessOutput,
    /// Files written before returning, relative to the working directory
    /// unless absolute.
    pub writes: Vec<(PathBuf, String)>,
    /// Time to wait before returning.
    pub delay: Option<Duration>,
    /// Fail to launch instead of returning output.
    pub spawn_error: bool,
}

impl Default for ScriptedResponse {
    fn default() -> Self {
        Self {
            output: ProcessOutput::success(""),
            writes: Vec::new(),
            delay: None,
            spawn_error: false,
        }
    }
}

impl ScriptedResponse {
    /// Exits zero with the given stdout.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::from_output(ProcessOutput::success(stdout))
    }

    /// Exits nonzero with the given stderr.
    #[must_use]
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::from_output(ProcessOutput::failure(exit_code, stderr))
    }

    /// Returns exactly this output.
    #[must_use]
    pub fn from_output(output: ProcessOutput) -> Self {
        Self {
            output,
            ..Self::default()
        }
    }

    /// Fails to launch.
    #[must_use]
    pub fn spawn_failure() -> Self {
        Self {
            spawn_error: true,
            ..Self::default()
        }
    }

    /// Writes a file before returning.
    #[must_use]
    pub fn writes(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.writes.push((path.into(), contents.into()));
        self
    }

    /// Sleeps before returning.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A process executor that replays scripted responses.
///
/// Rules are matched in insertion order by substring of the rendered
/// command; unmatched commands get the fallback (zero exit, no output).
/// Every invocation is recorded.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    rules: Mutex<Vec<(String, ScriptedResponse)>>,
    fallback: Mutex<ScriptedResponse>,
    invocations: Mutex<Vec<ProcessInvocation>>,
}

impl ScriptedExecutor {
    /// Creates an executor where every command succeeds silently.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Responds to commands containing `fragment`.
    #[must_use]
    pub fn on(self, fragment: impl Into<String>, response: ScriptedResponse) -> Self {
        self.rules.lock().push((fragment.into(), response));
        self
    }

    /// Sets the response for unmatched commands.
    pub fn set_fallback(&self, response: ScriptedResponse) {
        *self.fallback.lock() = response;
    }

    /// Returns the number of invocations so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.invocations.lock().len()
    }

    /// Returns every rendered command, in invocation order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.invocations
            .lock()
            .iter()
            .map(|inv| inv.command.clone())
            .collect()
    }

    /// Returns every recorded invocation.
    #[must_use]
    pub fn invocations(&self) -> Vec<ProcessInvocation> {
        self.invocations.lock().clone()
    }

    /// Returns how many commands contained `fragment`.
    #[must_use]
    pub fn calls_matching(&self, fragment: &str) -> usize {
        self.invocations
            .lock()
            .iter()
            .filter(|inv| inv.command.contains(fragment))
            .count()
    }

    fn response_for(&self, command: &str) -> ScriptedResponse {
        self.rules
            .lock()
            .iter()
            .find(|(fragment, _)| command.contains(fragment.as_str()))
            .map_or_else(|| self.fallback.lock().clone(), |(_, response)| response.clone())
    }
}

#[async_trait]
impl ProcessExecutor for ScriptedExecutor {
    async fn execute(&self, invocation: &ProcessInvocation) -> Result<ProcessOutput, ProcessError> {
        self.invocations.lock().push(invocation.clone());
        let response = self.response_for(&invocation.command);

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        if response.spawn_error {
            return Err(ProcessError::Spawn {
                command: invocation.command.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "command not found"),
            });
        }

        for (path, contents) in &response.writes {
            let path = invocation.working_dir.join(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| ProcessError::Spawn {
                    command: invocation.command.clone(),
                    source,
                })?;
            }
            std::fs::write(&path, contents).map_err(|source| ProcessError::Spawn {
                command: invocation.command.clone(),
                source,
            })?;
        }

        Ok(response.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rules_match_by_substring() {
        let executor = ScriptedExecutor::new()
            .on("code2prompt", ScriptedResponse::success("exported"))
            .on("security_audit", ScriptedResponse::failure(2, "model offline"));

        let out = executor
            .execute(&ProcessInvocation::new("code2prompt \".\"", "."))
            .await
            .unwrap();
        assert_eq!(out.stdout, "exported");

        let out = executor
            .execute(&ProcessInvocation::new("python3 scripts/security_audit.py", "."))
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(2));

        let out = executor
            .execute(&ProcessInvocation::new("something else", "."))
            .await
            .unwrap();
        assert!(out.is_zero_exit());

        assert_eq!(executor.call_count(), 3);
        assert_eq!(executor.calls_matching("code2prompt"), 1);
    }

    #[tokio::test]
    async fn test_writes_relative_to_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let executor = ScriptedExecutor::new().on(
            "export",
            ScriptedResponse::success("").writes("reports/root-report.md", "# digest"),
        );

        executor
            .execute(&ProcessInvocation::new("export", dir.path()))
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("reports/root-report.md")).unwrap();
        assert_eq!(written, "# digest");
    }

    #[test]
    fn test_commands_recorded_in_order() {
        let executor = ScriptedExecutor::new();
        tokio_test::block_on(async {
            for command in ["first", "second"] {
                executor
                    .execute(&ProcessInvocation::new(command, "."))
                    .await
                    .unwrap();
            }
        });
        assert_eq!(executor.commands(), vec!["first", "second"]);
        assert_eq!(executor.invocations()[1].working_dir, PathBuf::from("."));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let executor = ScriptedExecutor::new();
        executor.set_fallback(ScriptedResponse::spawn_failure());
        let err = executor
            .execute(&ProcessInvocation::new("missing-tool", "."))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing-tool"));
    }
}
