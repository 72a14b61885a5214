//! Status listener trait and implementations.

use crate::core::{EventPhase, StatusEvent};
use parking_lot::RwLock;
use std::fmt;
use tracing::{debug, error, info, warn, Level};

/// Receives status events from a [`super::StatusReporter`].
///
/// Listeners are called synchronously, in subscription order, before the
/// runner moves on to the next stage.
pub trait StatusListener: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &StatusEvent);
}

/// A listener that logs events using the tracing framework.
///
/// Failures are logged at `error`, warnings at `warn`, everything else at the
/// configured level.
#[derive(Debug, Clone)]
pub struct LoggingListener {
    level: Level,
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingListener {
    /// Creates a new logging listener with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging listener.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl StatusListener for LoggingListener {
    fn on_event(&self, event: &StatusEvent) {
        let stage = event.stage_name.as_str();
        let phase = event.phase;
        match (phase, event.warning) {
            (EventPhase::Failed, true) => warn!(stage, %phase, "{}", event.message),
            (EventPhase::Failed, false) => error!(stage, %phase, "{}", event.message),
            _ if self.level == Level::DEBUG => debug!(stage, %phase, "{}", event.message),
            _ => info!(stage, %phase, "{}", event.message),
        }
    }
}

/// A collecting listener for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingListener {
    events: RwLock<Vec<StatusEvent>>,
}

impl CollectingListener {
    /// Creates a new collecting listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns `(stage, phase)` pairs in arrival order.
    #[must_use]
    pub fn transitions(&self) -> Vec<(String, EventPhase)> {
        self.events
            .read()
            .iter()
            .map(|e| (e.stage_name.clone(), e.phase))
            .collect()
    }

    /// Returns the events for one stage.
    #[must_use]
    pub fn events_for(&self, stage: &str) -> Vec<StatusEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.stage_name == stage)
            .cloned()
            .collect()
    }
}

impl StatusListener for CollectingListener {
    fn on_event(&self, event: &StatusEvent) {
        self.events.write().push(event.clone());
    }
}

/// Adapts a closure into a listener.
pub struct FnListener<F>
where
    F: Fn(&StatusEvent) + Send + Sync,
{
    func: F,
}

impl<F> FnListener<F>
where
    F: Fn(&StatusEvent) + Send + Sync,
{
    /// Wraps a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> fmt::Debug for FnListener<F>
where
    F: Fn(&StatusEvent) + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener").finish_non_exhaustive()
    }
}

impl<F> StatusListener for FnListener<F>
where
    F: Fn(&StatusEvent) + Send + Sync,
{
    fn on_event(&self, event: &StatusEvent) {
        (self.func)(event);
    }
}
