//! Side-effecting adapters: processes, files, configuration, templates.

pub mod checkers;
pub mod config;
pub mod materialize;
pub mod oracle;
pub mod process;
pub mod prompt;
pub mod run_log;
