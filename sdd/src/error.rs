//! Typed failure causes.
//!
//! Fatal errors travel as `anyhow::Error` and are recovered with
//! `downcast_ref` where the caller needs to distinguish them (exit codes).
//! Isolated failures are plain values stored in reports.

use serde::Serialize;
use thiserror::Error;

use crate::core::diagnostics::ErrorKind;
use crate::core::schema::PhaseName;

/// Fatal errors that abort a generation run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid setup detected before any phase starts.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A phase broke its boundary contract.
    #[error("phase {phase} failed: {message}")]
    PhaseExecution { phase: PhaseName, message: String },
    /// A structured payload could not be pulled out of an oracle response.
    #[error("extraction failed: {0}")]
    Extraction(String),
}

impl PipelineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }

    pub fn phase(phase: PhaseName, message: impl Into<String>) -> Self {
        PipelineError::PhaseExecution {
            phase,
            message: message.into(),
        }
    }
}

/// A checker could not be run or its output could not be read.
///
/// Never fatal: the checker contributes zero errors for that collection.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{checker} checker failed: {message}")]
pub struct DiagnosticToolError {
    pub checker: ErrorKind,
    pub message: String,
}

/// A single file group could not be repaired during one attempt.
///
/// Never fatal: the group's errors persist into the next check.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("repair of {file} failed: {message}")]
pub struct RepairRequestError {
    pub file: String,
    pub message: String,
}
