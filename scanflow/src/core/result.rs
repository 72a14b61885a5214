//! Per-stage result recorded on a pipeline run.

use super::StageStatus;
use crate::errors::StageError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// The recorded outcome of one stage.
///
/// A result starts out [`StageStatus::Pending`] and is mutated by the runner
/// as the stage progresses. Every outcome, including skips, ends up here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub stage: String,
    /// Current status.
    pub status: StageStatus,
    /// The rendered command, once the stage has been attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Combined stdout and stderr captured from the process.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
    /// Exit code reported by the process, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Where the stage writes its artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Capture groups extracted by the success pattern.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub captures: HashMap<String, String>,
    /// Warning attached to a soft failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Failure details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,
    /// Wall-clock duration of the stage in milliseconds.
    pub duration_ms: f64,
}

impl StageResult {
    /// Creates a pending result for a stage.
    #[must_use]
    pub fn pending(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Self::default()
        }
    }

    /// Returns a capture group by name or index.
    #[must_use]
    pub fn capture(&self, key: &str) -> Option<&str> {
        self.captures.get(key).map(String::as_str)
    }

    /// Returns true if the stage produced its artifact on disk.
    #[must_use]
    pub fn artifact_exists(&self) -> bool {
        self.output_path.as_deref().is_some_and(std::path::Path::exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_result() {
        let result = StageResult::pending("export");
        assert_eq!(result.stage, "export");
        assert_eq!(result.status, StageStatus::Pending);
        assert!(result.error.is_none());
        assert!(!result.artifact_exists());
    }

    #[test]
    fn test_capture_lookup() {
        let mut result = StageResult::pending("server-start");
        result.captures.insert("port".to_string(), "41343".to_string());
        assert_eq!(result.capture("port"), Some("41343"));
        assert_eq!(result.capture("1"), None);
    }

    #[test]
    fn test_artifact_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("root-report.md");
        let mut result = StageResult::pending("export");
        result.output_path = Some(path.clone());
        assert!(!result.artifact_exists());

        std::fs::write(&path, "# digest").unwrap();
        assert!(result.artifact_exists());
    }
}
