//! Deterministic artifact paths derived from a target identifier.

use crate::config::ScanConfig;
use crate::errors::{Result, ScanflowError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fragment used when the target is the whole workspace.
pub const ROOT_FRAGMENT: &str = "root";

/// Which output directory a stage writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactLocation {
    /// The markdown/JSON report directory.
    ReportDir,
    /// The rendered HTML directory.
    HtmlDir,
}

/// Static suffix table: stage name → (location, file suffix).
///
/// The audit script names its report after the markdown stem and the HTML
/// renderer names its page after the JSON stem, so the suffixes chain.
const ARTIFACT_SUFFIXES: &[(&str, ArtifactLocation, &str)] = &[
    ("export", ArtifactLocation::ReportDir, "-report.md"),
    (
        "audit",
        ArtifactLocation::ReportDir,
        "-report_audit_report.json",
    ),
    (
        "render",
        ArtifactLocation::HtmlDir,
        "-report_audit_report_report.html",
    ),
];

/// Looks up the location and suffix registered for a stage.
#[must_use]
pub fn artifact_suffix(stage: &str) -> Option<(ArtifactLocation, &'static str)> {
    ARTIFACT_SUFFIXES
        .iter()
        .find(|(name, _, _)| *name == stage)
        .map(|(_, location, suffix)| (*location, *suffix))
}

/// Normalizes a target identifier into a filesystem-safe fragment.
///
/// The root sentinels (`""`, `"."`, `"./"`, `"/"`) map to [`ROOT_FRAGMENT`];
/// otherwise leading `./` and surrounding separators are dropped and the
/// remaining separators become `-`.
///
/// ```
/// use scanflow::artifacts::normalize_target;
///
/// assert_eq!(normalize_target("."), "root");
/// assert_eq!(normalize_target("src/api"), "src-api");
/// ```
#[must_use]
pub fn normalize_target(target: &str) -> String {
    let mut trimmed = target.trim();
    loop {
        if let Some(rest) = trimmed.strip_prefix("./") {
            trimmed = rest;
        } else if let Some(rest) = trimmed.strip_prefix(".\\") {
            trimmed = rest;
        } else {
            break;
        }
    }
    let trimmed = trimmed.trim_matches(|c| c == '/' || c == '\\');

    if trimmed.is_empty() || trimmed == "." {
        return ROOT_FRAGMENT.to_string();
    }

    trimmed
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            other => other,
        })
        .collect()
}

/// Resolves the artifact path of `stage` for `target` under `base_dir`.
///
/// Pure function: identical arguments always yield identical paths.
///
/// # Errors
///
/// Returns [`ScanflowError::UnknownArtifactStage`] when the stage has no
/// registered suffix.
pub fn resolve(target: &str, stage: &str, base_dir: &Path) -> Result<PathBuf> {
    let (_, suffix) = artifact_suffix(stage)
        .ok_or_else(|| ScanflowError::UnknownArtifactStage(stage.to_string()))?;
    Ok(base_dir.join(format!("{}{suffix}", normalize_target(target))))
}

/// The full set of artifact paths for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSet {
    /// Normalized target fragment.
    pub fragment: String,
    /// Markdown digest written by the export stage.
    pub markdown: PathBuf,
    /// JSON report written by the audit stage.
    pub audit_json: PathBuf,
    /// HTML page written by the render stage.
    pub html: PathBuf,
}

/// Resolves stage output paths relative to a workspace root.
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    workspace_root: PathBuf,
    report_dir: PathBuf,
    html_dir: PathBuf,
}

impl ArtifactResolver {
    /// Creates a resolver. Relative `report_dir` and `html_dir` are taken
    /// relative to `workspace_root`.
    #[must_use]
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        report_dir: impl AsRef<Path>,
        html_dir: impl AsRef<Path>,
    ) -> Self {
        let workspace_root = workspace_root.into();
        let report_dir = workspace_root.join(report_dir);
        let html_dir = workspace_root.join(html_dir);
        Self {
            workspace_root,
            report_dir,
            html_dir,
        }
    }

    /// Creates a resolver from the scan configuration.
    #[must_use]
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(&config.workspace_root, &config.report_dir, &config.html_dir)
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Returns the absolute report directory.
    #[must_use]
    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Returns the absolute HTML directory.
    #[must_use]
    pub fn html_dir(&self) -> &Path {
        &self.html_dir
    }

    /// Returns the base directory a stage writes into.
    #[must_use]
    pub fn base_dir(&self, location: ArtifactLocation) -> &Path {
        match location {
            ArtifactLocation::ReportDir => &self.report_dir,
            ArtifactLocation::HtmlDir => &self.html_dir,
        }
    }

    /// Resolves the artifact path for a stage.
    ///
    /// # Errors
    ///
    /// Returns an error when the stage has no registered suffix.
    pub fn resolve(&self, target: &str, stage: &str) -> Result<PathBuf> {
        let (location, _) = artifact_suffix(stage)
            .ok_or_else(|| ScanflowError::UnknownArtifactStage(stage.to_string()))?;
        resolve(target, stage, self.base_dir(location))
    }

    /// Resolves every artifact path for a target at once.
    ///
    /// # Errors
    ///
    /// Only fails if the static suffix table is inconsistent.
    pub fn paths_for(&self, target: &str) -> Result<ArtifactSet> {
        Ok(ArtifactSet {
            fragment: normalize_target(target),
            markdown: self.resolve(target, "export")?,
            audit_json: self.resolve(target, "audit")?,
            html: self.resolve(target, "render")?,
        })
    }

    /// Creates the output directories if they are missing.
    ///
    /// # Errors
    ///
    /// Returns an IO error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.report_dir)?;
        std::fs::create_dir_all(&self.html_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_root_sentinels() {
        for sentinel in ["", ".", "./", "/", "  .  "] {
            assert_eq!(normalize_target(sentinel), ROOT_FRAGMENT, "sentinel {sentinel:?}");
        }
    }

    #[test]
    fn test_normalize_nested_paths() {
        assert_eq!(normalize_target("src/api"), "src-api");
        assert_eq!(normalize_target("./src/api/"), "src-api");
        assert_eq!(normalize_target("src\\api\\v1"), "src-api-v1");
        assert_eq!(normalize_target("lib"), "lib");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let base = Path::new("/work/reports");
        let first = resolve("src/api", "export", base).unwrap();
        let second = resolve("src/api", "export", base).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, PathBuf::from("/work/reports/src-api-report.md"));
    }

    #[test]
    fn test_resolve_unknown_stage() {
        let err = resolve("src", "lint", Path::new("reports")).unwrap_err();
        assert!(matches!(err, ScanflowError::UnknownArtifactStage(ref s) if s == "lint"));
    }

    #[test]
    fn test_resolver_paths_for_root() {
        let resolver = ArtifactResolver::new("/work", "reports", "report_html");
        let set = resolver.paths_for(".").unwrap();

        assert_eq!(set.fragment, "root");
        assert_eq!(set.markdown, PathBuf::from("/work/reports/root-report.md"));
        assert_eq!(
            set.audit_json,
            PathBuf::from("/work/reports/root-report_audit_report.json")
        );
        assert_eq!(
            set.html,
            PathBuf::from("/work/report_html/root-report_audit_report_report.html")
        );
    }

    #[test]
    fn test_ensure_dirs_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ArtifactResolver::new(dir.path(), "out/reports", "out/html");
        resolver.ensure_dirs().unwrap();
        assert!(dir.path().join("out/reports").is_dir());
        assert!(dir.path().join("out/html").is_dir());

        // Idempotent.
        resolver.ensure_dirs().unwrap();
    }
}
