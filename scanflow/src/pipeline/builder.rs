//! Pipeline builder with validation.

use crate::artifacts::artifact_suffix;
use crate::config::ScanConfig;
use crate::errors::PipelineValidationError;
use crate::stages::{scan_stages, StageDefinition, StageInput};
use std::collections::HashSet;

/// Placeholders every stage may use.
const BUILTIN_PLACEHOLDERS: &[&str] = &["target", "fragment"];

/// An ordered, validated list of stages.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    stages: Vec<StageDefinition>,
}

impl Pipeline {
    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the pipeline has no stages. Built pipelines never do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Returns true if any stage writes an artifact.
    #[must_use]
    pub fn produces_artifacts(&self) -> bool {
        self.stages.iter().any(StageDefinition::produces_output)
    }
}

/// Builder for creating validated pipelines.
///
/// Stage order is fixed by insertion order, and a stage may only consume the
/// output of a stage added before it.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    name: String,
    stages: Vec<StageDefinition>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Adds a stage to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (duplicate name, forward or
    /// unknown input, unresolvable placeholder, unknown artifact suffix).
    pub fn stage(mut self, stage: StageDefinition) -> Result<Self, PipelineValidationError> {
        self.add_stage(stage)?;
        Ok(self)
    }

    /// Adds several stages in order.
    ///
    /// # Errors
    ///
    /// Returns the first validation error.
    pub fn stages(
        mut self,
        stages: impl IntoIterator<Item = StageDefinition>,
    ) -> Result<Self, PipelineValidationError> {
        for stage in stages {
            self.add_stage(stage)?;
        }
        Ok(self)
    }

    /// Adds a stage in place.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn add_stage(&mut self, stage: StageDefinition) -> Result<(), PipelineValidationError> {
        if stage.name.trim().is_empty() {
            return Err(PipelineValidationError::new(
                "Stage name cannot be empty or whitespace-only",
            ));
        }

        if self.stages.iter().any(|s| s.name == stage.name) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' is defined twice",
                stage.name
            ))
            .with_stages(vec![stage.name.clone()]));
        }

        for input in stage.prior_inputs() {
            if input == stage.name {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' cannot consume its own output",
                    stage.name
                ))
                .with_stages(vec![stage.name.clone()]));
            }

            let Some(producer) = self.stages.iter().find(|s| s.name == input) else {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' consumes output of '{}', which is not an earlier stage",
                    stage.name, input
                ))
                .with_stages(vec![stage.name.clone(), input.to_string()]));
            };

            if !producer.produces_output() {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' consumes output of '{}', which produces no artifact",
                    stage.name, input
                ))
                .with_stages(vec![stage.name.clone(), input.to_string()]));
            }
        }

        if stage.produces_output() && artifact_suffix(&stage.name).is_none() {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' produces an artifact but has no registered artifact suffix",
                stage.name
            ))
            .with_stages(vec![stage.name.clone()]));
        }

        validate_placeholders(&stage)?;

        self.stages.push(stage);
        Ok(())
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or there are no stages.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new(
                "Pipeline name cannot be empty or whitespace-only",
            ));
        }
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new("Pipeline has no stages"));
        }

        Ok(Pipeline {
            name: self.name,
            stages: self.stages,
        })
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builds the export, audit and render pipeline from the configuration.
///
/// # Errors
///
/// Returns an error if the configured stages fail validation.
pub fn scan_pipeline(config: &ScanConfig) -> Result<Pipeline, PipelineValidationError> {
    PipelineBuilder::new("scan").stages(scan_stages(config))?.build()
}

fn validate_placeholders(stage: &StageDefinition) -> Result<(), PipelineValidationError> {
    let placeholders = stage.template.placeholders().map_err(|e| {
        PipelineValidationError::new(format!("Stage '{}': {e}", stage.name))
            .with_stages(vec![stage.name.clone()])
    })?;

    let mut known: HashSet<String> = BUILTIN_PLACEHOLDERS.iter().map(|s| (*s).to_string()).collect();
    if stage.produces_output() {
        known.insert("output".to_string());
    }
    for input in &stage.inputs {
        match input {
            StageInput::PriorOutput(producer) => {
                known.insert("input".to_string());
                known.insert(format!("input:{producer}"));
            }
            StageInput::Literal { name, .. } => {
                known.insert(name.clone());
            }
        }
    }

    if let Some(unknown) = placeholders.iter().find(|p| !known.contains(p.as_str())) {
        return Err(PipelineValidationError::new(format!(
            "Stage '{}' uses placeholder '{{{unknown}}}' that has no value",
            stage.name
        ))
        .with_stages(vec![stage.name.clone()]));
    }

    Ok(())
}
