//! The record of one pipeline invocation.

use crate::core::{RunStatus, StageResult, StageStatus};
use crate::errors::StageError;
use crate::utils::Timestamp;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Result of running a pipeline against one target.
///
/// Created by the runner, owned by it while the run is in progress, and
/// handed to the caller when the run ends. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// Name of the pipeline that ran.
    pub pipeline: String,
    /// Target identifier as given by the caller.
    pub target: String,
    /// Directory the stage processes ran in.
    pub working_dir: PathBuf,
    /// Overall status.
    pub status: RunStatus,
    /// One result per declared stage, in declaration order.
    pub stages: Vec<StageResult>,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    /// Total duration in milliseconds.
    pub duration_ms: f64,
    /// The error that halted the run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,
    /// Why the run was cancelled, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
}

impl PipelineRun {
    pub(crate) fn new(
        pipeline: &str,
        target: &str,
        working_dir: &Path,
        stage_names: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline: pipeline.to_string(),
            target: target.to_string(),
            working_dir: working_dir.to_path_buf(),
            status: RunStatus::Running,
            stages: stage_names.into_iter().map(StageResult::pending).collect(),
            started_at: chrono::Utc::now(),
            finished_at: None,
            duration_ms: 0.0,
            error: None,
            cancel_reason: None,
        }
    }

    /// Returns the result for a stage.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == name)
    }

    pub(crate) fn stage_mut(&mut self, name: &str) -> Option<&mut StageResult> {
        self.stages.iter_mut().find(|s| s.stage == name)
    }

    /// Warnings attached to soft failures, in stage order.
    #[must_use]
    pub fn warnings(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter_map(|s| s.warning.as_deref())
            .collect()
    }

    /// Artifact paths that exist on disk, in stage order.
    #[must_use]
    pub fn artifacts(&self) -> Vec<&Path> {
        self.stages
            .iter()
            .filter(|s| s.artifact_exists())
            .filter_map(|s| s.output_path.as_deref())
            .collect()
    }

    /// The artifact of the first stage that produced one.
    #[must_use]
    pub fn primary_artifact(&self) -> Option<&Path> {
        self.artifacts().into_iter().next()
    }

    /// The single error that halted the run.
    ///
    /// `None` for runs that completed, even with warnings.
    #[must_use]
    pub fn terminal_error(&self) -> Option<&StageError> {
        match self.status {
            RunStatus::Failed | RunStatus::Cancelled => self.error.as_ref(),
            _ => None,
        }
    }

    /// Returns true if the run completed, possibly with warnings.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Number of stages that reached a terminal status.
    #[must_use]
    pub fn attempted_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.status != StageStatus::Pending)
            .count()
    }
}
