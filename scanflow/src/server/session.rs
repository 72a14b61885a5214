//! The record of a running model server.

use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};

/// A model server started through [`super::ServerController::start`].
///
/// The caller owns the session; there is no process-wide server state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSession {
    /// Port the server reported it listens on.
    pub port: u16,
    /// When the start command confirmed the server was up.
    pub started_at: Timestamp,
}

impl ServerSession {
    /// Creates a session that started now.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            port,
            started_at: chrono::Utc::now(),
        }
    }

    /// Returns the local base URL of the server.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}
