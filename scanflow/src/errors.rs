//! Error types for the scanflow pipeline.
//!
//! Two layers are kept apart:
//! - [`StageError`] describes why a single stage did not succeed. It is
//!   recorded on the stage result and never aborts the process on its own.
//! - [`ScanflowError`] is returned from fallible library calls (building a
//!   pipeline, loading configuration, preparing output directories).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ScanflowError>;

/// The main error type for scanflow operations.
#[derive(Debug, Error)]
pub enum ScanflowError {
    /// A pipeline definition is invalid.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A command template could not be rendered.
    #[error("Template error: {0}")]
    Template(String),

    /// The configuration is invalid or could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A target cannot be passed safely to the stage commands.
    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget {
        /// The target as given.
        target: String,
        /// Why it was refused.
        reason: String,
    },

    /// A stage name has no artifact location.
    #[error("No artifact suffix is registered for stage '{0}'")]
    UnknownArtifactStage(String),

    /// A stage failed in a way the caller asked to surface as an error.
    #[error("{0}")]
    Stage(#[from] StageError),

    /// The run was aborted through its cancellation token.
    #[error("Pipeline cancelled: {0}")]
    Cancelled(String),

    /// A success pattern failed to compile.
    #[error("Invalid success pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised when a pipeline definition fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// Why a single stage did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageError {
    /// The command could not be started, or exited nonzero without a
    /// recognized success pattern.
    #[error("Stage '{stage}' failed (exit status {}): {output}", exit_label(.exit_code))]
    ProcessLaunch {
        /// Stage name.
        stage: String,
        /// Exit code, if the process reported one.
        exit_code: Option<i32>,
        /// Captured diagnostic output.
        output: String,
    },

    /// The process reported no error but also no recognizable success evidence.
    #[error("Stage '{stage}' produced no recognizable success signal: {output}")]
    AmbiguousOutput {
        /// Stage name.
        stage: String,
        /// Captured diagnostic output.
        output: String,
    },

    /// A stage with a soft failure policy failed; the run continued.
    #[error("Stage '{stage}' failed softly: {message}")]
    SoftStage {
        /// Stage name.
        stage: String,
        /// Description of the underlying failure.
        message: String,
    },

    /// A required input file produced by an earlier stage is absent.
    #[error("Stage '{stage}' skipped: input from '{input_stage}' is missing at {}", .path.display())]
    MissingInput {
        /// Stage name.
        stage: String,
        /// The stage expected to produce the input.
        input_stage: String,
        /// Where the input was expected.
        path: PathBuf,
    },

    /// The stage ran past its timeout and its process was terminated.
    #[error("Stage '{stage}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Stage name.
        stage: String,
        /// The limit that was exceeded.
        timeout_ms: u64,
    },

    /// The run was aborted while this stage was in flight.
    #[error("Stage '{stage}' cancelled: {reason}")]
    Cancelled {
        /// Stage name.
        stage: String,
        /// Cancellation reason.
        reason: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

impl StageError {
    /// Returns the stage this error belongs to.
    #[must_use]
    pub fn stage(&self) -> &str {
        match self {
            Self::ProcessLaunch { stage, .. }
            | Self::AmbiguousOutput { stage, .. }
            | Self::SoftStage { stage, .. }
            | Self::MissingInput { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Cancelled { stage, .. } => stage,
        }
    }

    /// Returns a short machine-readable name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProcessLaunch { .. } => "process_launch",
            Self::AmbiguousOutput { .. } => "ambiguous_output",
            Self::SoftStage { .. } => "soft_stage",
            Self::MissingInput { .. } => "missing_input",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Timeouts and cancellations halt the run whatever the stage's policy.
    #[must_use]
    pub fn overrides_policy(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_with_stages() {
        let err = PipelineValidationError::new("bad order")
            .with_stages(vec!["audit".to_string(), "export".to_string()]);
        assert_eq!(err.to_string(), "bad order");
        assert_eq!(err.stages.len(), 2);
    }

    #[test]
    fn test_process_launch_message_includes_output() {
        let err = StageError::ProcessLaunch {
            stage: "server-start".to_string(),
            exit_code: Some(1),
            output: "lms: command not found".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("server-start"));
        assert!(message.contains("exit status 1"));
        assert!(message.contains("lms: command not found"));
    }

    #[test]
    fn test_process_launch_without_exit_code() {
        let err = StageError::ProcessLaunch {
            stage: "export".to_string(),
            exit_code: None,
            output: "spawn failed".to_string(),
        };
        assert!(err.to_string().contains("exit status none"));
    }

    #[test]
    fn test_missing_input_message() {
        let err = StageError::MissingInput {
            stage: "render".to_string(),
            input_stage: "audit".to_string(),
            path: PathBuf::from("reports/root-report_audit_report.json"),
        };
        assert!(err.to_string().contains("reports/root-report_audit_report.json"));
        assert_eq!(err.stage(), "render");
        assert_eq!(err.kind(), "missing_input");
    }

    #[test]
    fn test_policy_override() {
        let timeout = StageError::Timeout {
            stage: "audit".to_string(),
            timeout_ms: 10,
        };
        let soft = StageError::SoftStage {
            stage: "render".to_string(),
            message: "boom".to_string(),
        };
        assert!(timeout.overrides_policy());
        assert!(!soft.overrides_policy());
    }

    #[test]
    fn test_stage_error_serialization() {
        let err = StageError::Timeout {
            stage: "audit".to_string(),
            timeout_ms: 1500,
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["timeout_ms"], 1500);

        let back: StageError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_stage_error_converts_into_scanflow_error() {
        let err: ScanflowError = StageError::AmbiguousOutput {
            stage: "server-start".to_string(),
            output: String::new(),
        }
        .into();
        assert!(matches!(err, ScanflowError::Stage(_)));
    }
}
