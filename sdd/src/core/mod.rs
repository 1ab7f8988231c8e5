//! Deterministic, pure logic shared by the pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data (oracle text, checker output, phase payloads) and return deterministic
//! outputs suitable for tests.

pub mod classifier;
pub mod diagnostics;
pub mod extract;
pub mod plan;
pub mod schema;
pub mod types;
