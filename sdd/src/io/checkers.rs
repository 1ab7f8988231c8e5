//! Type and lint checker adapters.
//!
//! Each checker runs as a bounded child process in the project directory.
//! A checker that cannot be run, times out, or prints something unreadable is
//! recorded as a [`DiagnosticToolError`] and contributes no errors; it never
//! hides the other checker's findings.

use std::path::Path;
use std::process::Command;

use anyhow::{Result, anyhow};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::core::diagnostics::{
    ErrorInfo, ErrorKind, count_unique_files, parse_lint_output, parse_type_checker_output,
};
use crate::error::DiagnosticToolError;
use crate::io::config::FixConfig;
use crate::io::process::{ProcessLimits, ProcessOutput, run_bounded};

/// Result of one collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Type errors first, then lint errors.
    pub errors: Vec<ErrorInfo>,
    pub tool_failures: Vec<DiagnosticToolError>,
}

impl Diagnostics {
    pub fn from_errors(errors: Vec<ErrorInfo>) -> Self {
        Self {
            errors,
            tool_failures: Vec::new(),
        }
    }
}

/// Source of diagnostics for a project directory.
pub trait DiagnosticsCollector {
    fn collect(&self, project_dir: &Path) -> Diagnostics;
}

impl<T: DiagnosticsCollector + ?Sized> DiagnosticsCollector for &T {
    fn collect(&self, project_dir: &Path) -> Diagnostics {
        (**self).collect(project_dir)
    }
}

/// Collector that shells out to the configured checker commands.
#[derive(Debug, Clone)]
pub struct CheckerCollector {
    type_checker: Option<Vec<String>>,
    lint_checker: Option<Vec<String>>,
    limits: ProcessLimits,
}

impl CheckerCollector {
    pub fn new(
        type_checker: Option<Vec<String>>,
        lint_checker: Option<Vec<String>>,
        limits: ProcessLimits,
    ) -> Self {
        Self {
            type_checker,
            lint_checker,
            limits,
        }
    }

    /// Build from `[fix]`, leaving out disabled checkers.
    pub fn from_config(config: &FixConfig) -> Self {
        Self::new(
            config.check_types.then(|| config.type_checker.clone()),
            config.check_lint.then(|| config.lint_checker.clone()),
            config.limits(),
        )
    }

    fn run_checker(&self, command: &[String], project_dir: &Path) -> Result<ProcessOutput> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("checker command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(project_dir);
        let output = run_bounded(cmd, None, self.limits)?;
        if output.timed_out {
            return Err(anyhow!(
                "timed out after {}s",
                self.limits.timeout.as_secs()
            ));
        }
        Ok(output)
    }

    fn check_types(&self, command: &[String], project_dir: &Path) -> Result<Checked> {
        let output = self.run_checker(command, project_dir)?;
        if output.status.success() {
            return Ok(Checked::default());
        }
        let stdout = output.stdout_text();
        let (text, dropped) = if stdout.trim().is_empty() {
            (output.stderr_text(), output.stderr_truncated)
        } else {
            (stdout, output.stdout_truncated)
        };
        Ok(Checked {
            errors: parse_type_checker_output(&text),
            lost: (dropped > 0).then(|| self.truncation_notice(dropped)),
        })
    }

    fn check_lint(&self, command: &[String], project_dir: &Path) -> Result<Checked> {
        let output = self.run_checker(command, project_dir)?;
        if output.status.success() {
            return Ok(Checked::default());
        }
        if output.stdout_truncated > 0 {
            return Err(anyhow!(
                "unreadable report: {}",
                self.truncation_notice(output.stdout_truncated)
            ));
        }
        let errors = parse_lint_output(&output.stdout_text())
            .map_err(|err| anyhow!("unreadable report: {err}"))?;
        Ok(Checked { errors, lost: None })
    }

    fn truncation_notice(&self, dropped: usize) -> String {
        format!(
            "output truncated after {} bytes ({dropped} bytes dropped); some diagnostics are missing",
            self.limits.output_limit_bytes
        )
    }
}

/// Errors parsed from one checker run, plus a note when part of its output
/// was lost.
#[derive(Debug, Default)]
struct Checked {
    errors: Vec<ErrorInfo>,
    lost: Option<String>,
}

impl DiagnosticsCollector for CheckerCollector {
    #[instrument(skip_all, fields(project_dir = %project_dir.display()))]
    fn collect(&self, project_dir: &Path) -> Diagnostics {
        let mut diagnostics = Diagnostics::default();

        if let Some(command) = &self.type_checker {
            let result = self.check_types(command, project_dir);
            record(&mut diagnostics, ErrorKind::Type, result);
        }
        if let Some(command) = &self.lint_checker {
            let result = self.check_lint(command, project_dir);
            record(&mut diagnostics, ErrorKind::Lint, result);
        }

        info!(
            errors = diagnostics.errors.len(),
            files = count_unique_files(&diagnostics.errors),
            tool_failures = diagnostics.tool_failures.len(),
            "collected diagnostics"
        );
        diagnostics
    }
}

fn record(diagnostics: &mut Diagnostics, checker: ErrorKind, result: Result<Checked>) {
    match result {
        Ok(checked) => {
            info!(%checker, count = checked.errors.len(), "checker finished");
            diagnostics.errors.extend(checked.errors);
            if let Some(message) = checked.lost {
                warn!(%checker, %message, "checker output incomplete");
                diagnostics
                    .tool_failures
                    .push(DiagnosticToolError { checker, message });
            }
        }
        Err(err) => {
            warn!(%checker, err = %format!("{err:#}"), "checker failed");
            diagnostics.tool_failures.push(DiagnosticToolError {
                checker,
                message: format!("{err:#}"),
            });
        }
    }
}
