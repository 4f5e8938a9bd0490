//! Stable exit codes for `skipcheck` commands.

/// The job must run (or `validate` succeeded).
pub const RUN: i32 = 0;
/// Invalid configuration or input.
pub const INVALID: i32 = 1;
/// The job may be skipped.
pub const SKIP: i32 = 2;
