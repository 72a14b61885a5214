//! Test assertions for pipeline runs.

use crate::core::{RunStatus, StageStatus};
use crate::pipeline::PipelineRun;

/// Asserts the overall status of a run.
pub fn assert_run_status(run: &PipelineRun, expected: RunStatus) {
    assert_eq!(
        run.status, expected,
        "Expected run status {:?}, got {:?} (error: {:?})",
        expected, run.status, run.error
    );
}

/// Asserts the status of one stage.
pub fn assert_stage_status(run: &PipelineRun, stage: &str, expected: StageStatus) {
    let actual = run.stage(stage).map(|s| s.status);
    assert_eq!(
        actual,
        Some(expected),
        "Expected stage '{}' to be {:?}, got {:?}",
        stage,
        expected,
        actual
    );
}

/// Asserts that a stage never ran.
pub fn assert_stage_not_attempted(run: &PipelineRun, stage: &str) {
    let result = run.stage(stage);
    assert!(
        result.is_some_and(|s| s.status == StageStatus::Pending && s.command.is_none()),
        "Expected stage '{}' not to be attempted, got {:?}",
        stage,
        result
    );
}

/// Asserts that a stage's artifact exists on disk and returns its path.
pub fn assert_artifact_written<'a>(run: &'a PipelineRun, stage: &str) -> &'a std::path::Path {
    let result = run.stage(stage);
    let path = result.and_then(|s| s.output_path.as_deref());
    assert!(
        result.is_some_and(crate::core::StageResult::artifact_exists),
        "Expected stage '{}' to have written its artifact at {:?}",
        stage,
        path
    );
    path.unwrap_or_else(|| std::path::Path::new(""))
}
