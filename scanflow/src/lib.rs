//! # Scanflow
//!
//! A security-scan report pipeline over opaque external tools.
//!
//! Scanflow runs a fixed sequence of shell commands against a target folder:
//!
//! - **export**: a code-to-prompt exporter writes a markdown digest
//! - **audit**: a python script audits the digest and writes a JSON report
//! - **render**: a python script turns the JSON report into an HTML page
//!
//! Artifact paths are derived deterministically from the target, every stage
//! transition is reported to pluggable listeners, and failures are either
//! fatal (the run stops) or soft (the run continues with a warning).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scanflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = ScanConfig::default().apply_env()?;
//! let runner = PipelineRunner::from_config(Arc::new(ShellExecutor::default()), &config)
//!     .with_listener(Arc::new(LoggingListener::default()));
//!
//! let run = runner.run("src/api", &scan_pipeline(&config)?).await?;
//! println!("{}: {:?}", run.status, run.artifacts());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod artifacts;
pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod process;
pub mod server;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::artifacts::{normalize_target, ArtifactResolver, ArtifactSet};
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::ScanConfig;
    pub use crate::core::{EventPhase, RunStatus, StageResult, StageStatus, StatusEvent};
    pub use crate::errors::{PipelineValidationError, Result, ScanflowError, StageError};
    pub use crate::events::{
        CollectingListener, FnListener, LoggingListener, StatusListener, StatusReporter,
    };
    pub use crate::pipeline::{
        scan_pipeline, Pipeline, PipelineBuilder, PipelineRun, PipelineRunner, TargetLocks,
    };
    pub use crate::process::{ProcessExecutor, ProcessInvocation, ProcessOutput, ShellExecutor};
    pub use crate::server::{ServerController, ServerSession};
    pub use crate::stages::{FailurePolicy, StageDefinition, StageInput, SuccessSignal};
    pub use crate::utils::{iso_timestamp, Timestamp};
}
