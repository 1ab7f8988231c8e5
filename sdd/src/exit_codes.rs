//! Stable exit codes for `sdd` commands.

/// Command succeeded; for `generate` and `fix`, the project is clean or repair was skipped.
pub const OK: i32 = 0;
/// A phase, I/O, or extraction failure stopped the command.
pub const FAILED: i32 = 1;
/// Invalid configuration or missing credentials; nothing was generated.
pub const CONFIG: i32 = 2;
/// The repair loop stopped with errors remaining.
pub const UNCONVERGED: i32 = 3;
