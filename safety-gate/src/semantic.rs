//! Stage 2 — Semantic validation via an external type-checker
//! subprocess.
//!
//! Preference order, version probes, and timeouts are ported from
//! `SemanticAnalyzer`: `pyright` then `mypy` for Python (the faster one
//! first, per `prefer_pyright`'s default), `tsc --noEmit` for
//! TypeScript. JavaScript has no type system to check and always
//! returns `tooling_unavailable`.

use std::process::Stdio;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::Deserialize;
use syntax_engine::LanguageKind;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::verdict::{Diagnostic, Severity, ValidationVerdict};
use core_config::CheckerPreference;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checker {
    Pyright,
    Mypy,
    Tsc,
}

impl Checker {
    fn binary(&self) -> &'static str {
        match self {
            Checker::Pyright => "pyright",
            Checker::Mypy => "mypy",
            Checker::Tsc => "tsc",
        }
    }

    fn name(&self) -> &'static str {
        self.binary()
    }
}

pub struct SemanticResult {
    pub verdict: ValidationVerdict,
    pub checker_used: Option<&'static str>,
    pub elapsed_ms: u64,
}

/// Candidates tried in order for a given language and preference.
fn candidates_for(language: LanguageKind, preference: CheckerPreference) -> Vec<Checker> {
    match language {
        LanguageKind::Python => match preference {
            CheckerPreference::StricterFirst => vec![Checker::Pyright, Checker::Mypy],
            CheckerPreference::LooserFirst => vec![Checker::Mypy, Checker::Pyright],
        },
        LanguageKind::TypeScript => vec![Checker::Tsc],
        LanguageKind::JavaScript => Vec::new(),
    }
}

/// Probes `<checker> --version` with a 5s timeout; `Ok(true)` if the
/// binary ran and exited successfully.
async fn probe_available(checker: Checker, probe_timeout: Duration) -> bool {
    let run = Command::new(checker.binary())
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match tokio::time::timeout(probe_timeout, run).await {
        Ok(Ok(status)) => status.success(),
        _ => false,
    }
}

/// Runs Stage 2 against `candidate`, written to `temp_path` by the
/// caller. Returns `tooling_unavailable` if no checker in the
/// preference order is installed.
pub async fn validate_semantics(
    candidate: &str,
    language: LanguageKind,
    temp_path: &std::path::Path,
    preference: CheckerPreference,
    probe_timeout: Duration,
    check_timeout: Duration,
) -> SemanticResult {
    let started = Instant::now();

    let candidates = candidates_for(language, preference);
    if candidates.is_empty() {
        return SemanticResult {
            verdict: ValidationVerdict::ToolingUnavailable,
            checker_used: None,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
    }

    if tokio::fs::write(temp_path, candidate).await.is_err() {
        return SemanticResult {
            verdict: ValidationVerdict::ToolingUnavailable,
            checker_used: None,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
    }

    for checker in candidates {
        if !probe_available(checker, probe_timeout).await {
            debug!(checker = checker.name(), "checker not available, trying next");
            continue;
        }

        let verdict = run_checker(checker, temp_path, check_timeout).await;
        let _ = tokio::fs::remove_file(temp_path).await;
        return SemanticResult {
            verdict,
            checker_used: Some(checker.name()),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
    }

    let _ = tokio::fs::remove_file(temp_path).await;
    SemanticResult {
        verdict: ValidationVerdict::ToolingUnavailable,
        checker_used: None,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

async fn run_checker(checker: Checker, path: &std::path::Path, timeout: Duration) -> ValidationVerdict {
    let mut cmd = Command::new(checker.binary());
    match checker {
        Checker::Pyright => {
            cmd.arg("--outputjson").arg(path);
        }
        Checker::Mypy => {
            cmd.arg(path);
        }
        Checker::Tsc => {
            cmd.arg("--noEmit").arg(path);
        }
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(out)) => out,
        Ok(Err(e)) => {
            return ValidationVerdict::SemanticError {
                diagnostics: vec![Diagnostic {
                    line: 0,
                    column: 0,
                    message: format!("{} failed to launch: {e}", checker.name()),
                    severity: Severity::Error,
                }],
            };
        }
        Err(_) => {
            return ValidationVerdict::SemanticError {
                diagnostics: vec![Diagnostic {
                    line: 0,
                    column: 0,
                    message: format!("{} analysis timed out", checker.name()),
                    severity: Severity::Error,
                }],
            };
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if checker == Checker::Pyright {
        if let Some(verdict) = parse_pyright_json(&stdout) {
            return verdict;
        }
        warn!("pyright output was not valid JSON, falling back to text parsing");
    }

    parse_text_diagnostics(&stdout, &stderr)
}

#[derive(Deserialize)]
struct PyrightOutput {
    #[serde(rename = "generalDiagnostics", default)]
    general_diagnostics: Vec<PyrightDiagnostic>,
}

#[derive(Deserialize)]
struct PyrightDiagnostic {
    range: PyrightRange,
    message: String,
    severity: String,
}

#[derive(Deserialize)]
struct PyrightRange {
    start: PyrightPosition,
}

#[derive(Deserialize)]
struct PyrightPosition {
    line: usize,
    character: usize,
}

fn parse_pyright_json(stdout: &str) -> Option<ValidationVerdict> {
    let parsed: PyrightOutput = serde_json::from_str(stdout).ok()?;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for diag in parsed.general_diagnostics {
        let severity = if diag.severity == "error" {
            Severity::Error
        } else {
            Severity::Warning
        };
        let d = Diagnostic {
            line: diag.range.start.line + 1,
            column: diag.range.start.character,
            message: diag.message,
            severity,
        };
        if severity == Severity::Error {
            errors.push(d);
        } else {
            warnings.push(d);
        }
    }

    if errors.is_empty() {
        Some(ValidationVerdict::Ok)
    } else {
        Some(ValidationVerdict::SemanticError { diagnostics: errors })
    }
}

/// Regex-based text fallback, matching `_parse_pyright_text`'s
/// `:(\d+):(\d+)\s+-\s+(error|warning):\s+(.+)` pattern, generalized to
/// also accept mypy/tsc's colon-delimited `path:line:col: error: msg`
/// shape.
fn parse_text_diagnostics(stdout: &str, stderr: &str) -> ValidationVerdict {
    let dash_pattern = Regex::new(r":(\d+):(\d+)\s+-\s+(error|warning):\s+(.+)").unwrap();
    let colon_pattern = Regex::new(r":(\d+):(\d+):\s+(error|warning):\s+(.+)").unwrap();

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for line in format!("{stdout}\n{stderr}").lines() {
        let captures = dash_pattern.captures(line).or_else(|| colon_pattern.captures(line));
        if let Some(caps) = captures {
            let line_num: usize = caps[1].parse().unwrap_or(0);
            let col_num: usize = caps[2].parse().unwrap_or(0);
            let severity = if &caps[3] == "error" { Severity::Error } else { Severity::Warning };
            let message = caps[4].to_string();
            let diag = Diagnostic {
                line: line_num,
                column: col_num,
                message,
                severity,
            };
            if severity == Severity::Error {
                errors.push(diag);
            } else {
                warnings.push(diag);
            }
        }
    }

    if errors.is_empty() {
        ValidationVerdict::Ok
    } else {
        ValidationVerdict::SemanticError { diagnostics: errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pyright_json_with_no_diagnostics_is_ok() {
        let json = r#"{"generalDiagnostics": []}"#;
        assert_eq!(parse_pyright_json(json), Some(ValidationVerdict::Ok));
    }

    #[test]
    fn pyright_json_error_surfaces_as_semantic_error() {
        let json = r#"{"generalDiagnostics": [{"range":{"start":{"line":2,"character":4}},"message":"undefined name 'x'","severity":"error"}]}"#;
        let verdict = parse_pyright_json(json).unwrap();
        match verdict {
            ValidationVerdict::SemanticError { diagnostics } => {
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].line, 3);
            }
            _ => panic!("expected semantic error"),
        }
    }

    #[test]
    fn invalid_json_returns_none_for_fallback() {
        assert!(parse_pyright_json("not json").is_none());
    }

    #[test]
    fn text_fallback_extracts_dash_style_diagnostics() {
        let stdout = "file.py:3:5 - error: undefined variable 'y'\n";
        let verdict = parse_text_diagnostics(stdout, "");
        match verdict {
            ValidationVerdict::SemanticError { diagnostics } => {
                assert_eq!(diagnostics[0].line, 3);
                assert_eq!(diagnostics[0].column, 5);
            }
            _ => panic!("expected semantic error"),
        }
    }

    #[test]
    fn python_prefers_pyright_first_by_default() {
        let candidates = candidates_for(LanguageKind::Python, CheckerPreference::StricterFirst);
        assert_eq!(candidates[0], Checker::Pyright);
    }

    #[test]
    fn javascript_has_no_candidates() {
        assert!(candidates_for(LanguageKind::JavaScript, CheckerPreference::StricterFirst).is_empty());
    }
}
