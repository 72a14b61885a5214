//! Stage definitions: one external command per stage.

use super::CommandTemplate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What happens to the run when a stage fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the run; later stages are never attempted.
    #[default]
    Fatal,
    /// Record the failure as a warning and continue.
    Soft,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal => write!(f, "fatal"),
            Self::Soft => write!(f, "soft"),
        }
    }
}

/// A value a stage's command template consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageInput {
    /// The artifact produced by an earlier stage. The file must exist when
    /// the stage starts.
    PriorOutput(String),
    /// A caller-supplied value exposed as `{name}`.
    Literal {
        /// Placeholder name.
        name: String,
        /// Substituted value.
        value: String,
    },
}

/// Where a stage writes its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputRule {
    /// The stage writes an artifact at the path the resolver assigns to its
    /// name, exposed to the template as `{output}`.
    Artifact,
    /// The stage produces no file.
    #[default]
    None,
}

/// How a stage proves it succeeded.
#[derive(Debug, Clone)]
pub enum SuccessSignal {
    /// Zero exit status.
    ExitCode,
    /// The pattern matches the combined output, or the exit status is zero.
    /// A match wins over a nonzero exit status.
    PatternOrExitCode(Regex),
    /// The combined output contains the text, or the exit status is zero.
    TextOrExitCode(String),
}

impl Default for SuccessSignal {
    fn default() -> Self {
        Self::ExitCode
    }
}

/// One external-command step in a pipeline.
#[derive(Debug, Clone)]
pub struct StageDefinition {
    /// The unique name of the stage.
    pub name: String,
    /// The command template.
    pub template: CommandTemplate,
    /// Ordered inputs.
    pub inputs: Vec<StageInput>,
    /// Output rule.
    pub output: OutputRule,
    /// Failure policy.
    pub policy: FailurePolicy,
    /// Success detection.
    pub success: SuccessSignal,
    /// Per-stage timeout; falls back to the runner's default.
    pub timeout: Option<Duration>,
}

impl StageDefinition {
    /// Creates a fatal, exit-code-checked stage with no inputs or output.
    #[must_use]
    pub fn new(name: impl Into<String>, template: impl Into<CommandTemplate>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            inputs: Vec::new(),
            output: OutputRule::None,
            policy: FailurePolicy::Fatal,
            success: SuccessSignal::ExitCode,
            timeout: None,
        }
    }

    /// Adds an input.
    #[must_use]
    pub fn with_input(mut self, input: StageInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Consumes the artifact of an earlier stage.
    #[must_use]
    pub fn reads(self, stage: impl Into<String>) -> Self {
        self.with_input(StageInput::PriorOutput(stage.into()))
    }

    /// Adds a caller-supplied value.
    #[must_use]
    pub fn with_literal(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_input(StageInput::Literal {
            name: name.into(),
            value: value.into(),
        })
    }

    /// Marks the stage as producing a resolver-assigned artifact.
    #[must_use]
    pub fn produces_artifact(mut self) -> Self {
        self.output = OutputRule::Artifact;
        self
    }

    /// Lets the run continue when this stage fails.
    #[must_use]
    pub fn soft(mut self) -> Self {
        self.policy = FailurePolicy::Soft;
        self
    }

    /// Accepts a pattern match in the output as success.
    #[must_use]
    pub fn with_success_pattern(mut self, pattern: Regex) -> Self {
        self.success = SuccessSignal::PatternOrExitCode(pattern);
        self
    }

    /// Accepts text in the output as success.
    #[must_use]
    pub fn with_success_text(mut self, text: impl Into<String>) -> Self {
        self.success = SuccessSignal::TextOrExitCode(text.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Names of earlier stages whose artifacts this stage consumes.
    pub fn prior_inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().filter_map(|input| match input {
            StageInput::PriorOutput(stage) => Some(stage.as_str()),
            StageInput::Literal { .. } => None,
        })
    }

    /// Returns true if the stage writes an artifact.
    #[must_use]
    pub fn produces_output(&self) -> bool {
        self.output == OutputRule::Artifact
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_definition_defaults() {
        let stage = StageDefinition::new("export", "exporter {target}");
        assert_eq!(stage.name, "export");
        assert_eq!(stage.policy, FailurePolicy::Fatal);
        assert_eq!(stage.output, OutputRule::None);
        assert!(matches!(stage.success, SuccessSignal::ExitCode));
        assert!(stage.timeout.is_none());
    }

    #[test]
    fn test_stage_definition_builder() {
        let stage = StageDefinition::new("render", "{python} \"{script}\" \"{input}\"")
            .reads("audit")
            .with_literal("python", "python3")
            .with_literal("script", "scripts/json_to_html.py")
            .produces_artifact()
            .soft()
            .with_timeout(Some(Duration::from_secs(5)));

        assert_eq!(stage.policy, FailurePolicy::Soft);
        assert!(stage.produces_output());
        assert_eq!(stage.prior_inputs().collect::<Vec<_>>(), vec!["audit"]);
        assert_eq!(stage.inputs.len(), 3);
    }

    #[test]
    fn test_success_signals() {
        let stage = StageDefinition::new("server-stop", "lms server stop").with_success_text("stopped");
        assert!(matches!(stage.success, SuccessSignal::TextOrExitCode(ref t) if t == "stopped"));

        let stage = StageDefinition::new("server-start", "lms server start")
            .with_success_pattern(Regex::new(r"port (\d+)").unwrap());
        assert!(matches!(stage.success, SuccessSignal::PatternOrExitCode(_)));
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(FailurePolicy::Fatal.to_string(), "fatal");
        assert_eq!(FailurePolicy::Soft.to_string(), "soft");
    }
}
