//! Stage and run status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a single stage within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    /// Stage has not started.
    #[default]
    Pending,
    /// Stage process is in flight.
    Running,
    /// Stage completed with positive evidence of success.
    Succeeded,
    /// Stage failed but its policy let the run continue.
    FailedSoft,
    /// Stage failed and could not contribute to the run.
    FailedFatal,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::FailedSoft => write!(f, "failed-soft"),
            Self::FailedFatal => write!(f, "failed-fatal"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedSoft | Self::FailedFatal)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if the status indicates failure of either kind.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FailedSoft | Self::FailedFatal)
    }
}

/// The overall status of a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// The run is still executing stages.
    #[default]
    Running,
    /// Every stage succeeded.
    Succeeded,
    /// The run completed but at least one soft stage failed.
    SucceededWithWarnings,
    /// A fatal stage failed and the run stopped.
    Failed,
    /// The run was aborted through its cancellation token.
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::SucceededWithWarnings => write!(f, "succeeded-with-warnings"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl RunStatus {
    /// Returns true if the run produced its results, possibly with warnings.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::SucceededWithWarnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Pending.to_string(), "pending");
        assert_eq!(StageStatus::Succeeded.to_string(), "succeeded");
        assert_eq!(StageStatus::FailedSoft.to_string(), "failed-soft");
        assert_eq!(StageStatus::FailedFatal.to_string(), "failed-fatal");
    }

    #[test]
    fn test_stage_status_is_terminal() {
        assert!(StageStatus::Succeeded.is_terminal());
        assert!(StageStatus::FailedSoft.is_terminal());
        assert!(StageStatus::FailedFatal.is_terminal());
        assert!(!StageStatus::Pending.is_terminal());
        assert!(!StageStatus::Running.is_terminal());
    }

    #[test]
    fn test_stage_status_serialize() {
        let json = serde_json::to_string(&StageStatus::FailedSoft).unwrap();
        assert_eq!(json, r#""failed-soft""#);

        let deserialized: StageStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, StageStatus::FailedSoft);
    }

    #[test]
    fn test_run_status() {
        assert_eq!(
            RunStatus::SucceededWithWarnings.to_string(),
            "succeeded-with-warnings"
        );
        assert!(RunStatus::SucceededWithWarnings.is_success());
        assert!(!RunStatus::Cancelled.is_success());
        assert_eq!(RunStatus::default(), RunStatus::Running);
    }
}
