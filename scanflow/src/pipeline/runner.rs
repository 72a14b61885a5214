//! Sequential stage execution.

use super::{Pipeline, PipelineRun, TargetLocks};
use crate::artifacts::{normalize_target, ArtifactResolver};
use crate::cancellation::CancellationToken;
use crate::config::ScanConfig;
use crate::core::{RunStatus, StageResult, StageStatus, StatusEvent};
use crate::errors::{Result, ScanflowError, StageError};
use crate::events::{StatusListener, StatusReporter};
use crate::process::{detect, Detection, ProcessExecutor, ProcessInvocation, ProcessOutput};
use crate::stages::{FailurePolicy, StageDefinition, StageInput, TemplateVars};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// What the runner does after a stage has been recorded.
enum Flow {
    Continue,
    Halt,
}

/// Runs pipelines stage by stage against a target.
///
/// One process is in flight per run. The status reporter is notified
/// synchronously at every transition, so listeners always see stage N's
/// outcome before stage N+1 starts.
#[derive(Clone)]
pub struct PipelineRunner {
    executor: Arc<dyn ProcessExecutor>,
    resolver: ArtifactResolver,
    reporter: StatusReporter,
    default_timeout: Option<Duration>,
    cancellation: Arc<CancellationToken>,
    locks: TargetLocks,
}

impl PipelineRunner {
    /// Creates a runner with no listeners, no default timeout and a fresh
    /// cancellation token.
    #[must_use]
    pub fn new(executor: Arc<dyn ProcessExecutor>, resolver: ArtifactResolver) -> Self {
        Self {
            executor,
            resolver,
            reporter: StatusReporter::new(),
            default_timeout: None,
            cancellation: Arc::new(CancellationToken::new()),
            locks: TargetLocks::new(),
        }
    }

    /// Creates a runner whose resolver and default timeout come from the
    /// configuration.
    #[must_use]
    pub fn from_config(executor: Arc<dyn ProcessExecutor>, config: &ScanConfig) -> Self {
        Self::new(executor, ArtifactResolver::from_config(config))
            .with_default_timeout(config.stage_timeout())
    }

    /// Replaces the status reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: StatusReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Adds a listener to the status reporter.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.reporter.subscribe(listener);
        self
    }

    /// Sets the timeout used by stages that do not declare one.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Uses a shared cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// Shares a per-target lock table with other runners.
    #[must_use]
    pub fn with_locks(mut self, locks: TargetLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Returns the artifact resolver.
    #[must_use]
    pub fn resolver(&self) -> &ArtifactResolver {
        &self.resolver
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancellation
    }

    /// Returns the per-target lock table.
    #[must_use]
    pub fn locks(&self) -> &TargetLocks {
        &self.locks
    }

    /// Runs `pipeline` against `target`.
    ///
    /// Stage failures never surface as `Err`: they are recorded on the
    /// returned [`PipelineRun`]. Runs on the same normalized target are
    /// serialized.
    ///
    /// # Errors
    ///
    /// Returns [`ScanflowError::InvalidTarget`] if `target` contains shell
    /// metacharacters. Otherwise returns an error only if the output
    /// directories cannot be prepared or a command template cannot be
    /// rendered.
    pub async fn run(&self, target: &str, pipeline: &Pipeline) -> Result<PipelineRun> {
        check_target(target)?;
        let run = PipelineRun::new(
            pipeline.name(),
            target,
            self.resolver.workspace_root(),
            pipeline.stages().iter().map(|s| s.name.clone()),
        );
        let span = info_span!(
            "pipeline.run",
            pipeline = %pipeline.name(),
            target = %target,
            run_id = %run.run_id,
        );
        self.execute(run, pipeline).instrument(span).await
    }

    async fn execute(&self, mut run: PipelineRun, pipeline: &Pipeline) -> Result<PipelineRun> {
        let fragment = normalize_target(&run.target);
        let _guard = self.locks.acquire(&fragment).await;
        let started = Instant::now();

        if pipeline.produces_artifacts() {
            self.resolver.ensure_dirs()?;
        }

        info!(stages = pipeline.len(), "Pipeline run started");

        let mut outputs: HashMap<String, PathBuf> = HashMap::new();

        for stage in pipeline.stages() {
            if self.cancellation.is_cancelled() {
                let reason = self.cancel_reason();
                warn!(stage = %stage.name, %reason, "Run cancelled before stage");
                self.reporter.notify(
                    &StatusEvent::failed(&stage.name, format!("Cancelled: {reason}"))
                        .add_data("run_id", json!(run.run_id)),
                );
                run.error = Some(StageError::Cancelled {
                    stage: stage.name.clone(),
                    reason: reason.clone(),
                });
                run.cancel_reason = Some(reason);
                break;
            }

            let mut result = StageResult::pending(&stage.name);
            let stage_start = Instant::now();

            let flow = self
                .run_stage(stage, &mut run, &mut result, &mut outputs, &fragment)
                .await;

            result.duration_ms = stage_start.elapsed().as_secs_f64() * 1000.0;
            if let Some(slot) = run.stage_mut(&stage.name) {
                *slot = result;
            }

            if matches!(flow?, Flow::Halt) {
                break;
            }
        }

        run.status = overall_status(&run);
        run.finished_at = Some(chrono::Utc::now());
        run.duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match run.status {
            RunStatus::Failed => error!(status = %run.status, "Pipeline run failed"),
            RunStatus::Cancelled => warn!(status = %run.status, "Pipeline run cancelled"),
            _ => info!(
                status = %run.status,
                duration_ms = run.duration_ms,
                "Pipeline run finished"
            ),
        }

        Ok(run)
    }

    async fn run_stage(
        &self,
        stage: &StageDefinition,
        run: &mut PipelineRun,
        result: &mut StageResult,
        outputs: &mut HashMap<String, PathBuf>,
        fragment: &str,
    ) -> Result<Flow> {
        if stage.produces_output() {
            let path = self.resolver.resolve(&run.target, &stage.name)?;
            remove_stale(&path)?;
            result.output_path = Some(path);
        }

        if let Some(missing) = missing_input(stage, run, outputs) {
            return Ok(self.record_failure(stage, run, result, missing));
        }

        let vars = self.template_vars(stage, &run.target, fragment, result, outputs);
        let command = stage.template.render(&vars)?;
        result.command = Some(command.clone());
        result.status = StageStatus::Running;

        info!(stage = %stage.name, "Stage started");
        debug!(stage = %stage.name, %command, "Rendered command");
        self.reporter.notify(
            &StatusEvent::started(&stage.name, format!("Running {}", stage.name))
                .add_data("run_id", json!(run.run_id))
                .add_data("command", json!(command)),
        );

        let timeout = stage.timeout.or(self.default_timeout);
        let invocation = ProcessInvocation::new(command, self.resolver.workspace_root())
            .with_timeout(timeout);

        let output = match self.invoke(&stage.name, &invocation).await {
            Ok(output) => output,
            Err(err) => {
                return Ok(self.record_failure_keeping_output(stage, run, result, outputs, err));
            }
        };

        result.output = output.combined();
        result.exit_code = output.exit_code;

        match detect(&stage.name, &stage.success, &output) {
            Detection::Succeeded { captures } => {
                result.status = StageStatus::Succeeded;
                result.captures = captures;
                if let Some(path) = &result.output_path {
                    outputs.insert(stage.name.clone(), path.clone());
                }

                info!(stage = %stage.name, exit_code = ?output.exit_code, "Stage succeeded");
                let mut event = StatusEvent::succeeded(&stage.name, format!("{} complete", stage.name))
                    .add_data("run_id", json!(run.run_id));
                if let Some(path) = &result.output_path {
                    event = event.add_data("output_path", json!(path));
                }
                if !result.captures.is_empty() {
                    event = event.add_data("captures", json!(result.captures));
                }
                self.reporter.notify(&event);
                Ok(Flow::Continue)
            }
            Detection::Failed(err) => {
                Ok(self.record_failure_keeping_output(stage, run, result, outputs, err))
            }
        }
    }

    /// Runs the process, racing it against the timeout and the cancellation
    /// token. Dropping the losing future kills the child.
    async fn invoke(
        &self,
        stage: &str,
        invocation: &ProcessInvocation,
    ) -> std::result::Result<ProcessOutput, StageError> {
        let execution = async {
            let outcome = match invocation.timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.executor.execute(invocation)).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            return Err(StageError::Timeout {
                                stage: stage.to_string(),
                                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                            })
                        }
                    }
                }
                None => self.executor.execute(invocation).await,
            };
            outcome.map_err(|e| StageError::ProcessLaunch {
                stage: stage.to_string(),
                exit_code: None,
                output: e.to_string(),
            })
        };

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(StageError::Cancelled {
                stage: stage.to_string(),
                reason: self.cancel_reason(),
            }),
            outcome = execution => outcome,
        }
    }

    /// Records a failure after the process ran. A soft-failed stage that still
    /// wrote its artifact hands that file to later stages.
    fn record_failure_keeping_output(
        &self,
        stage: &StageDefinition,
        run: &mut PipelineRun,
        result: &mut StageResult,
        outputs: &mut HashMap<String, PathBuf>,
        err: StageError,
    ) -> Flow {
        let flow = self.record_failure(stage, run, result, err);
        if result.status == StageStatus::FailedSoft {
            if let Some(path) = result.output_path.as_ref().filter(|p| p.exists()) {
                info!(stage = %stage.name, path = %path.display(), "Keeping partial output");
                outputs.insert(stage.name.clone(), path.clone());
            }
        }
        flow
    }

    /// Records a failed stage and decides whether the run goes on.
    fn record_failure(
        &self,
        stage: &StageDefinition,
        run: &mut PipelineRun,
        result: &mut StageResult,
        err: StageError,
    ) -> Flow {
        let halts = err.overrides_policy() || stage.policy == FailurePolicy::Fatal;
        let skipped = matches!(err, StageError::MissingInput { .. });

        let mut event = (if halts {
            StatusEvent::failed(&stage.name, err.to_string())
        } else {
            StatusEvent::warning(&stage.name, err.to_string())
        })
        .add_data("run_id", json!(run.run_id))
        .add_data("error_kind", json!(err.kind()));
        if let Some(code) = result.exit_code {
            event = event.add_data("exit_code", json!(code));
        }

        if halts {
            error!(stage = %stage.name, kind = err.kind(), "{err}");
            result.status = StageStatus::FailedFatal;
            if let StageError::Cancelled { reason, .. } = &err {
                run.cancel_reason = Some(reason.clone());
            }
            result.error = Some(err.clone());
            run.error = Some(err);
            self.reporter.notify(&event);
            return Flow::Halt;
        }

        warn!(stage = %stage.name, kind = err.kind(), "{err}");
        result.warning = Some(err.to_string());
        if skipped {
            result.status = StageStatus::FailedFatal;
            result.error = Some(err);
        } else {
            result.status = StageStatus::FailedSoft;
            result.error = Some(StageError::SoftStage {
                stage: stage.name.clone(),
                message: err.to_string(),
            });
        }
        self.reporter.notify(&event);
        Flow::Continue
    }

    fn template_vars(
        &self,
        stage: &StageDefinition,
        target: &str,
        fragment: &str,
        result: &StageResult,
        outputs: &HashMap<String, PathBuf>,
    ) -> TemplateVars {
        let target_arg = if target.trim().is_empty() { "." } else { target };
        let mut vars = TemplateVars::new()
            .with("target", target_arg)
            .with("fragment", fragment);

        if let Some(path) = &result.output_path {
            vars.insert("output", path.display().to_string());
        }

        for input in &stage.inputs {
            match input {
                StageInput::PriorOutput(producer) => {
                    if let Some(path) = outputs.get(producer) {
                        let value = path.display().to_string();
                        if !vars.contains("input") {
                            vars.insert("input", value.clone());
                        }
                        vars.insert(format!("input:{producer}"), value);
                    }
                }
                StageInput::Literal { name, value } => vars.insert(name.clone(), value.clone()),
            }
        }

        vars
    }

    fn cancel_reason(&self) -> String {
        self.cancellation
            .reason()
            .unwrap_or_else(|| "cancelled".to_string())
    }
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("resolver", &self.resolver)
            .field("reporter", &self.reporter)
            .field("default_timeout", &self.default_timeout)
            .field("cancellation", &self.cancellation)
            .finish_non_exhaustive()
    }
}

/// Returns the first prior-stage input whose file is absent.
///
/// Only artifacts written during this run count: each stage's output file is
/// removed before the stage starts, and a producer is listed in `outputs`
/// only if it succeeded or soft-failed after writing its file.
fn missing_input(
    stage: &StageDefinition,
    run: &PipelineRun,
    outputs: &HashMap<String, PathBuf>,
) -> Option<StageError> {
    stage.prior_inputs().find_map(|producer| match outputs.get(producer) {
        Some(path) if path.exists() => None,
        _ => Some(StageError::MissingInput {
            stage: stage.name.clone(),
            input_stage: producer.to_string(),
            path: run
                .stage(producer)
                .and_then(|r| r.output_path.clone())
                .unwrap_or_default(),
        }),
    })
}

/// Deletes an artifact left by an earlier run.
fn remove_stale(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Targets are spliced into shell command lines. These characters end or
/// escape a double-quoted argument, or start a substitution, under `sh` or
/// `cmd`.
const SHELL_METACHARACTERS: &[char] = &[
    '"', '`', '$', ';', '&', '|', '<', '>', '%', '^', '\n', '\r', '\0',
];

fn check_target(target: &str) -> Result<()> {
    let offending = target.chars().find(|c| {
        SHELL_METACHARACTERS.contains(c) || (*c == '\\' && !cfg!(windows))
    });
    match offending {
        Some(c) => Err(ScanflowError::InvalidTarget {
            target: target.to_string(),
            reason: format!("contains shell metacharacter {c:?}"),
        }),
        None => Ok(()),
    }
}

fn overall_status(run: &PipelineRun) -> RunStatus {
    if run.cancel_reason.is_some() {
        return RunStatus::Cancelled;
    }
    if run.error.is_some() {
        return RunStatus::Failed;
    }
    if run.stages.iter().any(|s| s.status.is_failure()) {
        RunStatus::SucceededWithWarnings
    } else {
        RunStatus::Succeeded
    }
}
