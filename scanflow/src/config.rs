//! Configuration for the scan pipeline and the local model server.

use crate::errors::{Result, ScanflowError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "SCANFLOW_";

/// Configuration for the scan pipeline.
///
/// Every field has a default so a partial JSON file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory the external tools run in; artifact paths hang off it.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
    /// Directory for markdown digests and JSON reports.
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    /// Directory the HTML renderer writes into. The renderer is not told
    /// where to write, so only [`RENDERER_HTML_DIR`] is accepted.
    #[serde(default = "default_html_dir")]
    pub html_dir: PathBuf,
    /// Code-to-prompt exporter executable.
    #[serde(default = "default_exporter")]
    pub exporter: String,
    /// Python interpreter used for the audit and render scripts.
    #[serde(default = "default_python")]
    pub python: String,
    /// Path to the security audit script.
    #[serde(default = "default_audit_script")]
    pub audit_script: PathBuf,
    /// Path to the JSON-to-HTML script.
    #[serde(default = "default_html_script")]
    pub html_script: PathBuf,
    /// Local model server CLI.
    #[serde(default = "default_server_cli")]
    pub server_cli: String,
    /// Timeout for scan stages in seconds; 0 disables it.
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_seconds: u64,
    /// Timeout for server start/stop in seconds; 0 disables it.
    #[serde(default = "default_server_timeout")]
    pub server_timeout_seconds: u64,
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

/// Where the HTML renderer writes, relative to its working directory.
pub const RENDERER_HTML_DIR: &str = "report_html";

fn default_html_dir() -> PathBuf {
    PathBuf::from(RENDERER_HTML_DIR)
}

fn default_exporter() -> String {
    "code2prompt".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_audit_script() -> PathBuf {
    PathBuf::from("scripts/security_audit.py")
}

fn default_html_script() -> PathBuf {
    PathBuf::from("scripts/json_to_html.py")
}

fn default_server_cli() -> String {
    "lms".to_string()
}

fn default_stage_timeout() -> u64 {
    600
}

fn default_server_timeout() -> u64 {
    60
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            report_dir: default_report_dir(),
            html_dir: default_html_dir(),
            exporter: default_exporter(),
            python: default_python(),
            audit_script: default_audit_script(),
            html_script: default_html_script(),
            server_cli: default_server_cli(),
            stage_timeout_seconds: default_stage_timeout(),
            server_timeout_seconds: default_server_timeout(),
        }
    }
}

impl ScanConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScanflowError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Applies `SCANFLOW_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric override does not parse.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup.
    ///
    /// Recognized keys: `WORKSPACE_ROOT`, `REPORT_DIR`, `HTML_DIR`, `EXPORTER`,
    /// `PYTHON`, `AUDIT_SCRIPT`, `HTML_SCRIPT`, `SERVER_CLI`, `STAGE_TIMEOUT`,
    /// `SERVER_TIMEOUT`, each prefixed with [`ENV_PREFIX`].
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric override does not parse.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("WORKSPACE_ROOT") {
            self.workspace_root = PathBuf::from(v);
        }
        if let Some(v) = var("REPORT_DIR") {
            self.report_dir = PathBuf::from(v);
        }
        if let Some(v) = var("HTML_DIR") {
            self.html_dir = PathBuf::from(v);
        }
        if let Some(v) = var("EXPORTER") {
            self.exporter = v;
        }
        if let Some(v) = var("PYTHON") {
            self.python = v;
        }
        if let Some(v) = var("AUDIT_SCRIPT") {
            self.audit_script = PathBuf::from(v);
        }
        if let Some(v) = var("HTML_SCRIPT") {
            self.html_script = PathBuf::from(v);
        }
        if let Some(v) = var("SERVER_CLI") {
            self.server_cli = v;
        }
        if let Some(v) = var("STAGE_TIMEOUT") {
            self.stage_timeout_seconds = parse_seconds("STAGE_TIMEOUT", &v)?;
        }
        if let Some(v) = var("SERVER_TIMEOUT") {
            self.server_timeout_seconds = parse_seconds("SERVER_TIMEOUT", &v)?;
        }
        Ok(self)
    }

    /// Sets the workspace root.
    #[must_use]
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    /// Sets the report directory.
    #[must_use]
    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    /// Sets the stage timeout in seconds.
    #[must_use]
    pub fn with_stage_timeout(mut self, seconds: u64) -> Self {
        self.stage_timeout_seconds = seconds;
        self
    }

    /// Gets the scan stage timeout as a Duration, if enabled.
    #[must_use]
    pub fn stage_timeout(&self) -> Option<Duration> {
        (self.stage_timeout_seconds > 0).then(|| Duration::from_secs(self.stage_timeout_seconds))
    }

    /// Gets the server timeout as a Duration, if enabled.
    #[must_use]
    pub fn server_timeout(&self) -> Option<Duration> {
        (self.server_timeout_seconds > 0).then(|| Duration::from_secs(self.server_timeout_seconds))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("exporter", self.exporter.as_str()),
            ("python", self.python.as_str()),
            ("server_cli", self.server_cli.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ScanflowError::Config(format!("{field} cannot be empty")));
            }
        }

        if self.report_dir.as_os_str().is_empty() {
            return Err(ScanflowError::Config("report_dir cannot be empty".to_string()));
        }
        if self.report_dir.is_absolute() {
            return Err(ScanflowError::Config(
                "report_dir must be relative to workspace_root".to_string(),
            ));
        }
        if self.html_dir != Path::new(RENDERER_HTML_DIR) {
            return Err(ScanflowError::Config(format!(
                "html_dir must be '{RENDERER_HTML_DIR}', the directory the renderer writes to; got '{}'",
                self.html_dir.display()
            )));
        }

        Ok(())
    }
}

fn parse_seconds(name: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        ScanflowError::Config(format!("{ENV_PREFIX}{name} must be a whole number of seconds, got '{value}'"))
    })
}
