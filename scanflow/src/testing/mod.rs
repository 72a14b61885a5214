//! Testing utilities for scanflow pipelines.
//!
//! This module provides:
//! - A scripted process executor that stands in for the external tools
//! - Assertions over pipeline runs

mod assertions;
mod mocks;

pub use assertions::{
    assert_artifact_written, assert_run_status, assert_stage_not_attempted, assert_stage_status,
};
pub use mocks::{ScriptedExecutor, ScriptedResponse};
