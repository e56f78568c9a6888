//! WebSpec compiler and guarded plan executor.
//!
//! A declarative spec is compiled into a deterministic Plan IR whose every
//! effect is pre-declared, policy-checked and paired with a proof obligation;
//! the executor then re-validates and applies that plan. The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (schemas, macro expansion, plan
//!   building, guardrails, decision tree). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (registry, templates, processes, git,
//!   config, plan files). Isolated behind traits to enable fakes in tests.
//!
//! Orchestration modules ([`compile`], [`execute`]) coordinate core logic with
//! I/O to implement CLI commands.

pub mod compile;
pub mod core;
pub mod execute;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
