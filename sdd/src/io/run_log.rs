//! Run artifacts under the temp dir: one JSON file per phase output plus the
//! repair report.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::schema::{PhaseName, PhaseOutput};
use crate::core::types::RepairReport;

pub const FIX_REPORT_FILE: &str = "fix-report.json";
pub const ERROR_LOG_FILE: &str = "error.log";

#[derive(Debug, Clone)]
pub struct RunLog {
    dir: PathBuf,
}

impl RunLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn phase_output_path(&self, output: &PhaseOutput) -> PathBuf {
        self.dir.join(output.phase().output_file_name())
    }

    /// Persist the payload of `output` as `<phase file name>` in the log dir.
    pub fn write_phase_output(&self, output: &PhaseOutput) -> Result<PathBuf> {
        let path = self.phase_output_path(output);
        match output {
            PhaseOutput::SpecParser(payload) => write_json(&path, payload)?,
            PhaseOutput::Architecture(payload) => write_json(&path, payload)?,
            PhaseOutput::Database(payload) => write_json(&path, payload)?,
            PhaseOutput::Frontend(payload) => write_json(&path, payload)?,
            PhaseOutput::Backend(payload) => write_json(&path, payload)?,
            PhaseOutput::Testing(payload) => write_json(&path, payload)?,
            PhaseOutput::Config(payload) => write_json(&path, payload)?,
        }
        Ok(path)
    }

    pub fn write_fix_report(&self, report: &RepairReport) -> Result<PathBuf> {
        let path = self.dir.join(FIX_REPORT_FILE);
        write_json(&path, report)?;
        Ok(path)
    }

    /// Record the error that stopped a run.
    pub fn write_error(&self, phase: PhaseName, err: &anyhow::Error) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create directory {}", self.dir.display()))?;
        let path = self.dir.join(ERROR_LOG_FILE);
        fs::write(&path, format!("phase {phase} failed: {err:#}\n"))
            .with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Remove the log dir and everything in it. Missing dirs are fine.
    pub fn clean(&self) -> Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&self.dir).with_context(|| format!("remove {}", self.dir.display()))
    }
}

/// Serialize `value` to pretty-printed JSON with a trailing newline.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(value).context("serialize json")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}
