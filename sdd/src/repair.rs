//! Check-and-repair loop for a generated project.
//!
//! Each attempt collects diagnostics, groups them by file, and asks the oracle
//! to rewrite each failing file in turn. The loop stops when a check is clean,
//! when an attempt changes nothing, or when the attempt budget runs out. A
//! final collection always runs so the report reflects what is on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::diagnostics::{ErrorGroup, ErrorInfo, group_errors_by_file};
use crate::core::extract::extract_single_file;
use crate::core::types::{FixAttempt, RepairReport, RepairStop};
use crate::error::{PipelineError, RepairRequestError};
use crate::io::checkers::DiagnosticsCollector;
use crate::io::materialize::write_file;
use crate::io::oracle::GenerationOracle;
use crate::io::prompt::PromptEngine;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairConfig {
    pub max_attempts: u32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Where an error's file lives. Checkers may report absolute paths (eslint)
/// or paths relative to the project (tsc).
pub fn resolve_error_path(project_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}

/// Run the repair loop against `project_dir`.
///
/// `on_attempt` is called after every attempt is recorded. Only
/// `max_attempts == 0` is an error; everything that goes wrong for a single
/// file is recorded in that attempt's `skipped` list.
#[instrument(skip_all, fields(project_dir = %project_dir.display(), max_attempts = config.max_attempts))]
pub fn run_repair<O, C, F>(
    project_dir: &Path,
    oracle: &O,
    collector: &C,
    prompts: &PromptEngine,
    config: &RepairConfig,
    mut on_attempt: F,
) -> Result<RepairReport>
where
    O: GenerationOracle + ?Sized,
    C: DiagnosticsCollector + ?Sized,
    F: FnMut(&FixAttempt),
{
    if config.max_attempts == 0 {
        return Err(PipelineError::configuration("max_attempts must be at least 1").into());
    }

    let mut fix_results: Vec<FixAttempt> = Vec::new();
    let mut fixed_errors: Vec<ErrorInfo> = Vec::new();
    let mut files_modified: Vec<String> = Vec::new();
    let mut attempt_number = 0u32;

    let stop = loop {
        attempt_number += 1;
        let started = Instant::now();
        let errors = collector.collect(project_dir).errors;

        if errors.is_empty() {
            let attempt = FixAttempt {
                attempt_number,
                errors_found: 0,
                errors_fixed: 0,
                files_modified: Vec::new(),
                success: true,
                duration_ms: elapsed_ms(started),
                skipped: Vec::new(),
            };
            on_attempt(&attempt);
            fix_results.push(attempt);
            break RepairStop::Converged;
        }

        let groups = group_errors_by_file(&errors);
        info!(
            attempt = attempt_number,
            errors = errors.len(),
            files = groups.len(),
            "repairing"
        );
        let mut errors_fixed = 0usize;
        let mut modified = Vec::new();
        let mut skipped = Vec::new();
        for group in &groups {
            match repair_group(project_dir, group, oracle, prompts) {
                Ok(true) => {
                    errors_fixed += group.errors.len();
                    fixed_errors.extend(group.errors.iter().cloned());
                    modified.push(group.file.clone());
                }
                Ok(false) => debug!(file = %group.file, "no change"),
                Err(err) => {
                    warn!(file = %group.file, err = %format!("{err:#}"), "repair request failed");
                    skipped.push(RepairRequestError {
                        file: group.file.clone(),
                        message: format!("{err:#}"),
                    });
                }
            }
        }

        for file in &modified {
            if !files_modified.contains(file) {
                files_modified.push(file.clone());
            }
        }
        let attempt = FixAttempt {
            attempt_number,
            errors_found: errors.len(),
            errors_fixed,
            files_modified: modified,
            success: errors_fixed > 0,
            duration_ms: elapsed_ms(started),
            skipped,
        };
        on_attempt(&attempt);
        fix_results.push(attempt);

        if errors_fixed == 0 {
            break RepairStop::NoProgress;
        }
        if attempt_number >= config.max_attempts {
            break RepairStop::BudgetExhausted;
        }
    };

    let last = collector.collect(project_dir);
    let report = RepairReport {
        success: last.errors.is_empty(),
        attempts: attempt_number,
        fixed_errors,
        remaining_errors: last.errors,
        files_modified,
        fix_results,
        stop,
        tool_failures: last.tool_failures,
    };
    info!(
        success = report.success,
        attempts = report.attempts,
        remaining = report.remaining_errors.len(),
        stop = ?report.stop,
        "repair finished"
    );
    Ok(report)
}

/// Ask the oracle to fix one file. Returns whether the file was rewritten.
fn repair_group<O: GenerationOracle + ?Sized>(
    project_dir: &Path,
    group: &ErrorGroup,
    oracle: &O,
    prompts: &PromptEngine,
) -> Result<bool> {
    let path = resolve_error_path(project_dir, &group.file);
    let content =
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let prompt = prompts.render_fix(group, &content)?;
    let response = oracle.generate(&prompt, None)?;

    let Some(fixed) = extract_single_file(&response, &group.file) else {
        debug!(file = %group.file, "no code in repair response");
        return Ok(false);
    };
    if fixed == content {
        return Ok(false);
    }
    write_file(&path, &fixed)?;
    debug!(file = %group.file, bytes = fixed.len(), "rewrote file");
    Ok(true)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::checkers::Diagnostics;
    use crate::test_support::{ScriptedCollector, ScriptedOracle, type_error};

    fn fenced(body: &str) -> String {
        format!("```typescript\n{body}```\n")
    }

    #[test]
    fn zero_max_attempts_is_a_configuration_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = run_repair(
            dir.path(),
            &ScriptedOracle::new(Vec::new()),
            &ScriptedCollector::new(Vec::new()),
            &PromptEngine::new(),
            &RepairConfig { max_attempts: 0 },
            |_| {},
        )
        .expect_err("zero attempts");
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn identical_response_is_not_a_fix() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.ts"), "const a = b;\n").expect("write");
        let collector = ScriptedCollector::new(vec![Diagnostics::from_errors(vec![type_error(
            "a.ts", 1,
        )])]);
        let oracle = ScriptedOracle::new(vec![Ok(fenced("const a = b;\n"))]);

        let report = run_repair(
            dir.path(),
            &oracle,
            &collector,
            &PromptEngine::new(),
            &RepairConfig::default(),
            |_| {},
        )
        .expect("repair");

        assert_eq!(report.stop, RepairStop::NoProgress);
        assert_eq!(report.attempts, 1);
        assert_eq!(report.fix_results[0].errors_fixed, 0);
        assert!(report.files_modified.is_empty());
        assert_eq!(report.remaining_errors.len(), 1);
    }

    #[test]
    fn unreadable_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("b.ts"), "let x: number = 'y';\n").expect("write");
        let collector = ScriptedCollector::new(vec![
            Diagnostics::from_errors(vec![type_error("missing.ts", 1), type_error("b.ts", 1)]),
            Diagnostics::from_errors(vec![type_error("missing.ts", 1)]),
        ]);
        let oracle = ScriptedOracle::new(vec![Ok(fenced("let x: number = 1;\n"))]);

        let report = run_repair(
            dir.path(),
            &oracle,
            &collector,
            &PromptEngine::new(),
            &RepairConfig { max_attempts: 1 },
            |_| {},
        )
        .expect("repair");

        let first = &report.fix_results[0];
        assert_eq!(first.errors_fixed, 1);
        assert_eq!(first.skipped.len(), 1);
        assert_eq!(first.skipped[0].file, "missing.ts");
        assert_eq!(report.stop, RepairStop::BudgetExhausted);
        assert_eq!(
            fs::read_to_string(dir.path().join("b.ts")).expect("read"),
            "let x: number = 1;\n"
        );
    }

    #[test]
    fn absolute_error_paths_are_used_as_is() {
        let dir = tempfile::tempdir().expect("tempdir");
        let abs = dir.path().join("c.ts");
        assert_eq!(resolve_error_path(Path::new("/elsewhere"), abs.to_str().expect("utf8")), abs);
        assert_eq!(
            resolve_error_path(Path::new("/project"), "src/c.ts"),
            PathBuf::from("/project/src/c.ts")
        );
    }

    #[test]
    fn on_attempt_sees_every_attempt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let collector = ScriptedCollector::new(vec![Diagnostics::default()]);
        let mut seen = Vec::new();
        run_repair(
            dir.path(),
            &ScriptedOracle::new(Vec::new()),
            &collector,
            &PromptEngine::new(),
            &RepairConfig::default(),
            |attempt| seen.push(attempt.attempt_number),
        )
        .expect("repair");
        assert_eq!(seen, vec![1]);
    }
}
