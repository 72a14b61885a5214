//! Pipeline building and execution.
//!
//! This module provides:
//! - The pipeline builder with definition-time validation
//! - The sequential runner with fatal/soft failure handling
//! - The per-run record returned to callers
//! - Per-target run serialization

mod builder;
mod locks;
mod run;
mod runner;


pub use builder::{scan_pipeline, Pipeline, PipelineBuilder};
pub use locks::{TargetGuard, TargetLocks};
pub use run::PipelineRun;
pub use runner::PipelineRunner;
