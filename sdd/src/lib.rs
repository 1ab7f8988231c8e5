//! Spec-driven code generation.
//!
//! `sdd` turns a natural-language application spec into a project on disk by
//! running a fixed sequence of oracle-backed phases, then drives a bounded
//! check-and-repair loop until the project type-checks and lints cleanly.
//!
//! - **[`core`]**: Pure logic: artifact extraction, diagnostics parsing,
//!   payload schemas, generation plans, and file classification.
//! - **[`io`]**: Side effects: child processes, the oracle, checkers,
//!   configuration, templates, and files.
//!
//! [`phases`] and [`pipeline`] sequence generation; [`repair`] runs the
//! repair loop.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod phases;
pub mod pipeline;
pub mod repair;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
