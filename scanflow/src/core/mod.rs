//! Core domain model types for scanflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage and run status enums
//! - Per-stage results
//! - Status events

mod event;
mod result;
mod status;

pub use event::{EventPhase, StatusEvent};
pub use result::StageResult;
pub use status::{RunStatus, StageStatus};
