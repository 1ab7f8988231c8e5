//! Normalized diagnostics from external checkers.
//!
//! Parsing is pure: adapters in `io::checkers` run the processes and hand the
//! captured text to the functions here.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `path(line,column): severity code: message`
static TYPE_CHECKER_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\((\d+),(\d+)\):\s+(error|warning)\s+(\w+):\s+(.+)$").unwrap()
});

/// Lint severity that marks an error (1 is a warning).
const LINT_SEVERITY_ERROR: u8 = 2;

/// Which checker produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Type,
    Lint,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Type => "type",
            ErrorKind::Lint => "lint",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One diagnostic reported against a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub file: String,
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub kind: ErrorKind,
    pub severity: Severity,
}

/// All errors reported against one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorGroup {
    pub file: String,
    pub errors: Vec<ErrorInfo>,
}

/// Parse type-checker output. Lines outside the grammar are ignored.
pub fn parse_type_checker_output(output: &str) -> Vec<ErrorInfo> {
    output
        .lines()
        .filter_map(|line| parse_type_checker_line(line.trim_end_matches('\r')))
        .collect()
}

fn parse_type_checker_line(line: &str) -> Option<ErrorInfo> {
    let caps = TYPE_CHECKER_LINE_RE.captures(line)?;
    let severity = match &caps[4] {
        "warning" => Severity::Warning,
        _ => Severity::Error,
    };
    Some(ErrorInfo {
        file: caps[1].trim().to_string(),
        line: caps[2].parse().ok()?,
        column: caps[3].parse().ok(),
        message: caps[6].trim().to_string(),
        code: Some(caps[5].to_string()),
        kind: ErrorKind::Type,
        severity,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LintFileResult {
    file_path: String,
    #[serde(default)]
    messages: Vec<LintMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LintMessage {
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
    message: String,
    #[serde(default)]
    rule_id: Option<String>,
    severity: u8,
}

/// Parse lint-checker JSON output, keeping only error-severity messages.
///
/// Empty output means no findings. Anything else that is not the expected
/// JSON array is an error for the caller to isolate.
pub fn parse_lint_output(output: &str) -> serde_json::Result<Vec<ErrorInfo>> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    let results: Vec<LintFileResult> = serde_json::from_str(output)?;
    let errors = results
        .into_iter()
        .flat_map(|result| {
            let file = result.file_path;
            result
                .messages
                .into_iter()
                .filter(|msg| msg.severity == LINT_SEVERITY_ERROR)
                .map(move |msg| ErrorInfo {
                    file: file.clone(),
                    line: msg.line.unwrap_or(0),
                    column: msg.column,
                    message: msg.message,
                    code: msg.rule_id,
                    kind: ErrorKind::Lint,
                    severity: Severity::Error,
                })
        })
        .collect();
    Ok(errors)
}

/// Partition errors by file, preserving the order files are first seen.
pub fn group_errors_by_file(errors: &[ErrorInfo]) -> Vec<ErrorGroup> {
    let mut groups: IndexMap<&str, Vec<ErrorInfo>> = IndexMap::new();
    for error in errors {
        groups
            .entry(error.file.as_str())
            .or_default()
            .push(error.clone());
    }
    groups
        .into_iter()
        .map(|(file, errors)| ErrorGroup {
            file: file.to_string(),
            errors,
        })
        .collect()
}

/// Number of distinct files across `errors`.
pub fn count_unique_files(errors: &[ErrorInfo]) -> usize {
    errors
        .iter()
        .map(|error| error.file.as_str())
        .collect::<std::collections::HashSet<_>>()
        .len()
}

/// Render a 1-indexed list, one error per line:
/// `N. Line L[:C] - KIND CODE: message`.
pub fn format_error_list(errors: &[ErrorInfo]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(idx, err)| {
            let column = err.column.map(|c| format!(":{c}")).unwrap_or_default();
            format!(
                "{}. Line {}{} - {} {}: {}",
                idx + 1,
                err.line,
                column,
                err.kind.as_str().to_uppercase(),
                err.code.as_deref().unwrap_or(""),
                err.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
