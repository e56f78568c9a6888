//! Deterministic, pure logic of the compiler.
//!
//! Core modules are free of I/O side effects. They operate on in-memory
//! specs, manifests and plans and return deterministic outputs suitable for
//! tests.

pub mod builder;
pub mod decision_tree;
pub mod diagnostics;
pub mod docs;
pub mod guardrails;
pub mod macros;
pub mod manifest;
pub mod path;
pub mod plan;
pub mod policy;
pub mod schema;
pub mod similarity;
pub mod spec;
