//! Process exit codes for `sweeper` commands.

/// Every job compiled (and, for `run`, succeeded).
pub const OK: i32 = 0;
/// Bad arguments, settings, sweep file, or a compile error.
pub const INVALID: i32 = 1;
/// `sweeper run` had at least one job that failed or could not be compiled.
pub const JOB_FAILED: i32 = 2;
