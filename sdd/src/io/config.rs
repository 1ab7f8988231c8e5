//! Pipeline configuration stored in `sdd.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::io::process::ProcessLimits;

pub const DEFAULT_CONFIG_FILE: &str = "sdd.toml";

/// Top-level configuration (TOML).
///
/// Every field has a default, so an empty or missing file is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SddConfig {
    /// Directory that receives generated projects.
    pub output_dir: PathBuf,
    /// Directory for phase outputs and repair reports.
    pub temp_dir: PathBuf,
    pub oracle: OracleConfig,
    pub phases: PhaseToggles,
    pub fix: FixConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleConfig {
    /// Oracle CLI invocation; the prompt is written to its stdin.
    pub command: Vec<String>,
    /// Flag used to pass phase instructions. When unset, instructions are
    /// prepended to the prompt instead.
    pub system_prompt_arg: Option<String>,
    /// Environment variables that must be set before any phase runs.
    pub required_env: Vec<String>,
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            command: vec!["claude".to_string(), "-p".to_string()],
            system_prompt_arg: Some("--append-system-prompt".to_string()),
            required_env: vec!["ANTHROPIC_API_KEY".to_string()],
            timeout_secs: 10 * 60,
            output_limit_bytes: 2_000_000,
        }
    }
}

impl OracleConfig {
    pub fn limits(&self) -> ProcessLimits {
        ProcessLimits {
            timeout: Duration::from_secs(self.timeout_secs),
            output_limit_bytes: self.output_limit_bytes,
        }
    }
}

/// Optional code-generation phases. Spec parsing, architecture, and config
/// always run. Test generation is opt-in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PhaseToggles {
    pub database: bool,
    pub frontend: bool,
    pub backend: bool,
    pub testing: bool,
}

impl Default for PhaseToggles {
    fn default() -> Self {
        Self {
            database: true,
            frontend: true,
            backend: true,
            testing: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FixConfig {
    /// Run the repair loop after generation.
    pub enabled: bool,
    pub max_attempts: u32,
    pub check_types: bool,
    pub check_lint: bool,
    pub type_checker: Vec<String>,
    pub lint_checker: Vec<String>,
    /// Per-checker wall-clock budget.
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            check_types: true,
            check_lint: true,
            type_checker: ["npx", "tsc", "--noEmit", "--pretty", "false"]
                .map(String::from)
                .to_vec(),
            lint_checker: [
                "npx",
                "eslint",
                ".",
                "--format",
                "json",
                "--ext",
                ".ts,.tsx,.js,.jsx",
            ]
            .map(String::from)
            .to_vec(),
            timeout_secs: 5 * 60,
            output_limit_bytes: 5_000_000,
        }
    }
}

impl FixConfig {
    pub fn limits(&self) -> ProcessLimits {
        ProcessLimits {
            timeout: Duration::from_secs(self.timeout_secs),
            output_limit_bytes: self.output_limit_bytes,
        }
    }
}

impl Default for SddConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            temp_dir: PathBuf::from(".temp"),
            oracle: OracleConfig::default(),
            phases: PhaseToggles::default(),
            fix: FixConfig::default(),
        }
    }
}

impl SddConfig {
    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |message: &str| Err(PipelineError::configuration(message));
        if !is_runnable(&self.oracle.command) {
            return invalid("oracle.command must be a non-empty array");
        }
        if self.oracle.timeout_secs == 0 {
            return invalid("oracle.timeout_secs must be > 0");
        }
        if self.oracle.output_limit_bytes == 0 {
            return invalid("oracle.output_limit_bytes must be > 0");
        }
        if self
            .oracle
            .system_prompt_arg
            .as_deref()
            .is_some_and(|arg| arg.trim().is_empty())
        {
            return invalid("oracle.system_prompt_arg must not be blank");
        }
        if self.fix.max_attempts == 0 {
            return invalid("fix.max_attempts must be > 0");
        }
        if self.fix.timeout_secs == 0 {
            return invalid("fix.timeout_secs must be > 0");
        }
        if self.fix.output_limit_bytes == 0 {
            return invalid("fix.output_limit_bytes must be > 0");
        }
        if self.fix.check_types && !is_runnable(&self.fix.type_checker) {
            return invalid("fix.type_checker must be a non-empty array");
        }
        if self.fix.check_lint && !is_runnable(&self.fix.lint_checker) {
            return invalid("fix.lint_checker must be a non-empty array");
        }
        if self.output_dir.as_os_str().is_empty() {
            return invalid("output_dir must not be empty");
        }
        if self.temp_dir.as_os_str().is_empty() {
            return invalid("temp_dir must not be empty");
        }
        Ok(())
    }
}

fn is_runnable(command: &[String]) -> bool {
    command.first().is_some_and(|program| !program.trim().is_empty())
}

/// Load config from a TOML file.
///
/// A missing file yields `SddConfig::default()`. Validation happens after CLI
/// overrides are applied, so callers must invoke [`SddConfig::validate`].
pub fn load_config(path: &Path) -> Result<SddConfig> {
    if !path.exists() {
        return Ok(SddConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SddConfig = toml::from_str(&contents)
        .map_err(|err| PipelineError::configuration(format!("parse {}: {err}", path.display())))?;
    Ok(cfg)
}
