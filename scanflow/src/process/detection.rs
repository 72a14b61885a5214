//! Success detection over captured process output.
//!
//! Some wrapped tools misreport their exit status but print a reliable
//! success line, so a configured pattern takes precedence over the exit
//! code. Silence is never success: without a zero exit or a recognized
//! pattern the stage fails.

use super::ProcessOutput;
use crate::errors::StageError;
use crate::stages::SuccessSignal;
use std::collections::HashMap;

/// The verdict for one stage execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// Positive evidence of success; holds any pattern captures.
    Succeeded {
        /// Named groups by name, numbered groups by index.
        captures: HashMap<String, String>,
    },
    /// No evidence of success.
    Failed(StageError),
}

impl Detection {
    /// Returns true for [`Detection::Succeeded`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Decides whether a finished process satisfied its stage's success signal.
#[must_use]
pub fn detect(stage: &str, signal: &SuccessSignal, output: &ProcessOutput) -> Detection {
    let combined = output.combined();

    match signal {
        SuccessSignal::PatternOrExitCode(pattern) => {
            if let Some(caps) = pattern.captures(&combined) {
                let mut captures = HashMap::new();
                for (index, name) in pattern.capture_names().enumerate().skip(1) {
                    if let Some(m) = caps.get(index) {
                        captures.insert(index.to_string(), m.as_str().to_string());
                        if let Some(name) = name {
                            captures.insert(name.to_string(), m.as_str().to_string());
                        }
                    }
                }
                return Detection::Succeeded { captures };
            }
        }
        SuccessSignal::TextOrExitCode(text) => {
            if combined.contains(text.as_str()) {
                return Detection::Succeeded {
                    captures: HashMap::new(),
                };
            }
        }
        SuccessSignal::ExitCode => {}
    }

    match output.exit_code {
        Some(0) => Detection::Succeeded {
            captures: HashMap::new(),
        },
        Some(code) => Detection::Failed(StageError::ProcessLaunch {
            stage: stage.to_string(),
            exit_code: Some(code),
            output: combined,
        }),
        None => Detection::Failed(StageError::AmbiguousOutput {
            stage: stage.to_string(),
            output: combined,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::SERVER_READY_PATTERN;
    use pretty_assertions::assert_eq;
    use regex::Regex;

    fn ready_signal() -> SuccessSignal {
        SuccessSignal::PatternOrExitCode(Regex::new(SERVER_READY_PATTERN).unwrap())
    }

    #[test]
    fn test_zero_exit_succeeds() {
        let verdict = detect("export", &SuccessSignal::ExitCode, &ProcessOutput::success(""));
        assert!(verdict.is_success());
    }

    #[test]
    fn test_nonzero_exit_fails_with_output() {
        let verdict = detect(
            "render",
            &SuccessSignal::ExitCode,
            &ProcessOutput::failure(1, "Traceback: KeyError"),
        );
        assert_eq!(
            verdict,
            Detection::Failed(StageError::ProcessLaunch {
                stage: "render".to_string(),
                exit_code: Some(1),
                output: "Traceback: KeyError".to_string(),
            })
        );
    }

    #[test]
    fn test_pattern_wins_over_nonzero_exit() {
        let output =
            ProcessOutput::failure(1, "Success! Server is now running on port 41343\n");
        match detect("server-start", &ready_signal(), &output) {
            Detection::Succeeded { captures } => {
                assert_eq!(captures.get("port").map(String::as_str), Some("41343"));
                assert_eq!(captures.get("1").map(String::as_str), Some("41343"));
            }
            Detection::Failed(err) => panic!("expected success, got {err}"),
        }
    }

    #[test]
    fn test_pattern_missing_and_nonzero_exit_fails() {
        let output = ProcessOutput::failure(1, "Error: address already in use");
        let verdict = detect("server-start", &ready_signal(), &output);
        match verdict {
            Detection::Failed(StageError::ProcessLaunch { output, .. }) => {
                assert!(output.contains("address already in use"));
            }
            other => panic!("unexpected verdict {other:?}"),
        }
    }

    #[test]
    fn test_no_exit_code_and_no_pattern_is_ambiguous() {
        let output = ProcessOutput::new(None, "", "");
        let verdict = detect("server-start", &ready_signal(), &output);
        assert!(matches!(
            verdict,
            Detection::Failed(StageError::AmbiguousOutput { .. })
        ));
    }

    #[test]
    fn test_stop_text_or_exit_code() {
        let signal = SuccessSignal::TextOrExitCode("stopped".to_string());

        let by_text = detect("server-stop", &signal, &ProcessOutput::failure(1, "Server stopped."));
        assert!(by_text.is_success());

        let by_exit = detect("server-stop", &signal, &ProcessOutput::success(""));
        assert!(by_exit.is_success());

        let neither = detect("server-stop", &signal, &ProcessOutput::failure(1, "not running"));
        assert!(!neither.is_success());
    }
}
