//! The standard scan stages and the legacy server stages.

use super::StageDefinition;
use crate::config::ScanConfig;
use crate::errors::Result;
use regex::Regex;

/// Writes a markdown digest of the target.
pub const EXPORT_STAGE: &str = "export";
/// Sends the digest to the local model and writes a JSON report.
pub const AUDIT_STAGE: &str = "audit";
/// Converts the JSON report to HTML.
pub const RENDER_STAGE: &str = "render";
/// Starts the local model server.
pub const SERVER_START_STAGE: &str = "server-start";
/// Stops the local model server.
pub const SERVER_STOP_STAGE: &str = "server-stop";

/// Printed by the server CLI once it is listening; the `port` group holds
/// the port number.
pub const SERVER_READY_PATTERN: &str = r"Success! Server is now running on port (?P<port>\d+)";

/// Printed by the server CLI when it shut down.
pub const SERVER_STOPPED_TEXT: &str = "stopped";

/// Builds export → audit → render.
///
/// Export and audit are fatal; render is soft so a broken HTML step never
/// hides the markdown and JSON reports.
#[must_use]
pub fn scan_stages(config: &ScanConfig) -> Vec<StageDefinition> {
    let timeout = config.stage_timeout();

    vec![
        StageDefinition::new(
            EXPORT_STAGE,
            r#"{exporter} "{target}" --output-file "{output}""#,
        )
        .with_literal("exporter", config.exporter.clone())
        .produces_artifact()
        .with_timeout(timeout),
        StageDefinition::new(
            AUDIT_STAGE,
            r#"{python} "{audit_script}" "{input}" --output "{output}""#,
        )
        .reads(EXPORT_STAGE)
        .with_literal("python", config.python.clone())
        .with_literal("audit_script", config.audit_script.display().to_string())
        .produces_artifact()
        .with_timeout(timeout),
        StageDefinition::new(RENDER_STAGE, r#"{python} "{html_script}" "{input}""#)
            .reads(AUDIT_STAGE)
            .with_literal("python", config.python.clone())
            .with_literal("html_script", config.html_script.display().to_string())
            .produces_artifact()
            .soft()
            .with_timeout(timeout),
    ]
}

/// Builds the server start stage.
///
/// # Errors
///
/// Only fails if [`SERVER_READY_PATTERN`] does not compile.
pub fn server_start_stage(config: &ScanConfig) -> Result<StageDefinition> {
    Ok(
        StageDefinition::new(SERVER_START_STAGE, "{server_cli} server start")
            .with_literal("server_cli", config.server_cli.clone())
            .with_success_pattern(Regex::new(SERVER_READY_PATTERN)?)
            .with_timeout(config.server_timeout()),
    )
}

/// Builds the server stop stage.
#[must_use]
pub fn server_stop_stage(config: &ScanConfig) -> StageDefinition {
    StageDefinition::new(SERVER_STOP_STAGE, "{server_cli} server stop")
        .with_literal("server_cli", config.server_cli.clone())
        .with_success_text(SERVER_STOPPED_TEXT)
        .with_timeout(config.server_timeout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{FailurePolicy, SuccessSignal};

    #[test]
    fn test_scan_stage_order_and_policies() {
        let stages = scan_stages(&ScanConfig::default());
        let names: Vec<_> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![EXPORT_STAGE, AUDIT_STAGE, RENDER_STAGE]);

        assert_eq!(stages[0].policy, FailurePolicy::Fatal);
        assert_eq!(stages[1].policy, FailurePolicy::Fatal);
        assert_eq!(stages[2].policy, FailurePolicy::Soft);
        assert!(stages.iter().all(StageDefinition::produces_output));
    }

    #[test]
    fn test_scan_stages_chain_inputs() {
        let stages = scan_stages(&ScanConfig::default());
        assert!(stages[0].prior_inputs().next().is_none());
        assert_eq!(stages[1].prior_inputs().collect::<Vec<_>>(), vec![EXPORT_STAGE]);
        assert_eq!(stages[2].prior_inputs().collect::<Vec<_>>(), vec![AUDIT_STAGE]);
    }

    #[test]
    fn test_stage_timeout_follows_config() {
        let stages = scan_stages(&ScanConfig::default().with_stage_timeout(0));
        assert!(stages.iter().all(|s| s.timeout.is_none()));
    }

    #[test]
    fn test_server_ready_pattern_extracts_port() {
        let pattern = Regex::new(SERVER_READY_PATTERN).unwrap();
        let caps = pattern
            .captures("Starting server...\nSuccess! Server is now running on port 41343\n")
            .unwrap();
        assert_eq!(&caps["port"], "41343");
    }

    #[test]
    fn test_server_stages() {
        let config = ScanConfig::default();
        let start = server_start_stage(&config).unwrap();
        assert!(matches!(start.success, SuccessSignal::PatternOrExitCode(_)));
        assert!(!start.produces_output());

        let stop = server_stop_stage(&config);
        assert!(matches!(stop.success, SuccessSignal::TextOrExitCode(_)));
    }
}
