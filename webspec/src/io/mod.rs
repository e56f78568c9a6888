//! I/O helpers for webspec commands.

pub mod config;
pub mod git;
pub mod plan_store;
pub mod process;
pub mod registry;
pub mod template;
