//! Status events emitted at every stage transition.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Which transition a [`StatusEvent`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPhase {
    /// The stage is about to launch its process.
    Started,
    /// The stage finished with positive evidence of success.
    Succeeded,
    /// The stage failed, was skipped, or was cancelled.
    Failed,
}

impl fmt::Display for EventPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A human-readable progress notification for one stage.
///
/// Events are ephemeral: they are handed to listeners and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// The stage the event belongs to.
    pub stage_name: String,
    /// The transition being reported.
    pub phase: EventPhase,
    /// Message suitable for showing to a user.
    pub message: String,
    /// True when a failure did not halt the run.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub warning: bool,
    /// When the event occurred (ISO 8601).
    pub timestamp: String,
    /// Extra structured fields (run id, output path, captures).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,
}

impl StatusEvent {
    /// Creates a new status event.
    #[must_use]
    pub fn new(stage_name: impl Into<String>, phase: EventPhase, message: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            phase,
            message: message.into(),
            warning: false,
            timestamp: crate::utils::iso_timestamp(),
            data: HashMap::new(),
        }
    }

    /// Creates a "started" event.
    #[must_use]
    pub fn started(stage_name: &str, message: impl Into<String>) -> Self {
        Self::new(stage_name, EventPhase::Started, message)
    }

    /// Creates a "succeeded" event.
    #[must_use]
    pub fn succeeded(stage_name: &str, message: impl Into<String>) -> Self {
        Self::new(stage_name, EventPhase::Succeeded, message)
    }

    /// Creates a "failed" event.
    #[must_use]
    pub fn failed(stage_name: &str, message: impl Into<String>) -> Self {
        Self::new(stage_name, EventPhase::Failed, message)
    }

    /// Creates a "failed" event flagged as a warning (the run continues).
    #[must_use]
    pub fn warning(stage_name: &str, message: impl Into<String>) -> Self {
        let mut event = Self::failed(stage_name, message);
        event.warning = true;
        event
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}
