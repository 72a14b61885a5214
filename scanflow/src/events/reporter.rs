//! Fan-out of status events to listeners.

use super::StatusListener;
use crate::core::StatusEvent;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Delivers status events to zero or more listeners.
///
/// A panicking listener is isolated: the panic is caught and logged, the
/// remaining listeners still receive the event, and the caller never sees it.
#[derive(Clone, Default)]
pub struct StatusReporter {
    listeners: Vec<Arc<dyn StatusListener>>,
}

impl StatusReporter {
    /// Creates a reporter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener.
    pub fn subscribe(&mut self, listener: Arc<dyn StatusListener>) {
        self.listeners.push(listener);
    }

    /// Builder-style [`Self::subscribe`].
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.subscribe(listener);
        self
    }

    /// Returns the number of listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Delivers an event to every listener, in subscription order.
    pub fn notify(&self, event: &StatusEvent) {
        for listener in &self.listeners {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                warn!(
                    stage = %event.stage_name,
                    phase = %event.phase,
                    "Status listener panicked: {}",
                    panic_message(panic.as_ref())
                );
            }
        }
    }
}

impl fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusReporter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CollectingListener, FnListener};

    #[test]
    fn test_notify_reaches_all_listeners() {
        let first = Arc::new(CollectingListener::new());
        let second = Arc::new(CollectingListener::new());
        let reporter = StatusReporter::new()
            .with_listener(first.clone())
            .with_listener(second.clone());

        reporter.notify(&StatusEvent::started("export", "go"));

        assert_eq!(reporter.listener_count(), 2);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let collector = Arc::new(CollectingListener::new());
        let reporter = StatusReporter::new()
            .with_listener(Arc::new(FnListener::new(|_event: &StatusEvent| {
                panic!("listener exploded");
            })))
            .with_listener(collector.clone());

        reporter.notify(&StatusEvent::failed("audit", "boom"));

        // The second listener still saw the event.
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_empty_reporter() {
        let reporter = StatusReporter::default();
        reporter.notify(&StatusEvent::started("export", "go"));
        assert_eq!(reporter.listener_count(), 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(boxed.as_ref()), "owned message");

        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
