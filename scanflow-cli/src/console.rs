//! Human-readable progress on stderr.

use scanflow::core::{EventPhase, StatusEvent};
use scanflow::events::StatusListener;

/// Prints one line per stage transition, prefixed with the target.
#[derive(Debug)]
pub struct ConsoleListener {
    target: String,
}

impl ConsoleListener {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl StatusListener for ConsoleListener {
    fn on_event(&self, event: &StatusEvent) {
        let marker = match (event.phase, event.warning) {
            (EventPhase::Started, _) => "..",
            (EventPhase::Succeeded, _) => "ok",
            (EventPhase::Failed, true) => "!!",
            (EventPhase::Failed, false) => "xx",
        };
        eprintln!(
            "[{}] {marker} {}: {}",
            self.target, event.stage_name, event.message
        );
    }
}
