//! Stage definitions.
//!
//! A stage wraps one external command invocation together with the inputs it
//! consumes, the artifact it writes, how success is recognized and what a
//! failure means for the rest of the run.

mod catalog;
mod definition;
mod template;

pub use catalog::{
    scan_stages, server_start_stage, server_stop_stage, AUDIT_STAGE, EXPORT_STAGE, RENDER_STAGE,
    SERVER_READY_PATTERN, SERVER_START_STAGE, SERVER_STOPPED_TEXT, SERVER_STOP_STAGE,
};
pub use definition::{FailurePolicy, OutputRule, StageDefinition, StageInput, SuccessSignal};
pub use template::{CommandTemplate, TemplateVars};
