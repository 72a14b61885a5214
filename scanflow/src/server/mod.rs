//! Legacy single-stage model server commands.
//!
//! Starting and stopping the local model server are one-stage pipelines run
//! through the same runner as scans, so they share its timeout, cancellation
//! and status reporting.

mod session;

pub use session::ServerSession;

use crate::config::ScanConfig;
use crate::errors::{Result, ScanflowError, StageError};
use crate::pipeline::{Pipeline, PipelineBuilder, PipelineRun, PipelineRunner};
use crate::stages::{server_start_stage, server_stop_stage, SERVER_START_STAGE};
use std::sync::Arc;
use tracing::info;

/// Target identifier used for server runs; serializes start and stop.
pub const SERVER_TARGET: &str = "server";

/// Starts and stops the local model server.
#[derive(Debug, Clone)]
pub struct ServerController {
    runner: Arc<PipelineRunner>,
    start: Pipeline,
    stop: Pipeline,
}

impl ServerController {
    /// Creates a controller using the configured server CLI.
    ///
    /// # Errors
    ///
    /// Returns an error if the server stages fail validation.
    pub fn new(runner: Arc<PipelineRunner>, config: &ScanConfig) -> Result<Self> {
        let start = PipelineBuilder::new("server-start")
            .stage(server_start_stage(config)?)?
            .build()?;
        let stop = PipelineBuilder::new("server-stop")
            .stage(server_stop_stage(config))?
            .build()?;
        Ok(Self {
            runner,
            start,
            stop,
        })
    }

    /// Starts the server and returns its session.
    ///
    /// Succeeds only when the readiness line was seen and carried a port.
    ///
    /// # Errors
    ///
    /// Returns the stage error when the start command failed, and
    /// [`ScanflowError::Cancelled`] when the run was aborted.
    pub async fn start(&self) -> Result<ServerSession> {
        let run = self.runner.run(SERVER_TARGET, &self.start).await?;
        into_result(&run)?;

        let stage = run.stage(SERVER_START_STAGE);
        let port = stage
            .and_then(|s| s.capture("port"))
            .and_then(|p| p.parse::<u16>().ok());

        let Some(port) = port else {
            return Err(StageError::AmbiguousOutput {
                stage: SERVER_START_STAGE.to_string(),
                output: stage.map(|s| s.output.clone()).unwrap_or_default(),
            }
            .into());
        };

        info!(port, "Model server started");
        Ok(ServerSession::new(port))
    }

    /// Stops the server.
    ///
    /// # Errors
    ///
    /// Returns the stage error when the stop command failed.
    pub async fn stop(&self, session: Option<ServerSession>) -> Result<()> {
        let run = self.runner.run(SERVER_TARGET, &self.stop).await?;
        into_result(&run)?;

        match session {
            Some(session) => info!(port = session.port, "Model server stopped"),
            None => info!("Model server stopped"),
        }
        Ok(())
    }
}

fn into_result(run: &PipelineRun) -> Result<()> {
    match run.terminal_error() {
        None => Ok(()),
        Some(StageError::Cancelled { reason, .. }) => Err(ScanflowError::Cancelled(reason.clone())),
        Some(err) => Err(err.clone().into()),
    }
}
