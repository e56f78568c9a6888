//! Stable exit codes for webspec CLI commands.

/// Command succeeded (plan emitted, plan executed, report printed).
pub const OK: i32 = 0;
/// Invalid input or I/O failure (unreadable file, bad config, unknown plan language).
pub const INVALID: i32 = 1;
/// `webspec compile` produced error diagnostics, or `webspec run` rejected the plan before applying it.
pub const REJECTED: i32 = 2;
/// `webspec run` failed partway through a step.
pub const FAILED: i32 = 3;
