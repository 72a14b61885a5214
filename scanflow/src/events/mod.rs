//! Status reporting.
//!
//! The runner hands a [`StatusEvent`](crate::core::StatusEvent) to the
//! [`StatusReporter`] at every stage transition; the reporter fans it out to
//! its listeners.

mod listener;
mod reporter;

pub use listener::{CollectingListener, FnListener, LoggingListener, StatusListener};
pub use reporter::StatusReporter;
