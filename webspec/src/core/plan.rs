//! Plan IR: the compiled, deterministic, immutable execution plan.
//!
//! The serialized form is a stable contract: field names, op/check tags and key
//! order must not change between compiler versions so plans can be diffed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Language tag stamped on every persisted plan.
pub const PLAN_LANG: &str = "webspec.plan/v1";

/// Similarity threshold used when a fuzzy expectation does not set one.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub lang: String,
    pub target: String,
    pub preset_version: String,
    pub spec_hash: String,
    pub steps: Vec<PlanStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    /// Declared predecessors. Advisory only; steps run in list order.
    pub requires: Vec<String>,
    pub ops: Vec<Op>,
    pub checks: Vec<Check>,
    pub claims: Vec<String>,
    pub decisions: Vec<String>,
}

impl PlanStep {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn requiring(mut self, ids: &[&str]) -> Self {
        self.requires = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn has_ops(&self) -> bool {
        !self.ops.is_empty()
    }
}

/// Primitive operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Op {
    #[serde(rename = "RUN")]
    Run { cmd: String },
    #[serde(rename = "WRITE_FILE")]
    WriteFile { path: String, content: String },
    #[serde(rename = "APPEND_FILE")]
    AppendFile { path: String, content: String },
    #[serde(rename = "WRITE_TEMPLATE")]
    WriteTemplate {
        path: String,
        template: String,
        vars: BTreeMap<String, String>,
    },
}

impl Op {
    /// Destination path for write-producing ops.
    pub fn write_target(&self) -> Option<&str> {
        match self {
            Op::Run { .. } => None,
            Op::WriteFile { path, .. }
            | Op::AppendFile { path, .. }
            | Op::WriteTemplate { path, .. } => Some(path),
        }
    }

    pub fn command(&self) -> Option<&str> {
        match self {
            Op::Run { cmd } => Some(cmd),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Op::Run { .. } => "RUN",
            Op::WriteFile { .. } => "WRITE_FILE",
            Op::AppendFile { .. } => "APPEND_FILE",
            Op::WriteTemplate { .. } => "WRITE_TEMPLATE",
        }
    }
}

/// Primitive proof obligation evaluated after a step's ops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Check {
    #[serde(rename = "file.exists")]
    FileExists { path: String },
    #[serde(rename = "file.contains")]
    FileContains { path: String, text: String },
    #[serde(rename = "route.exists")]
    RouteExists { dir: String, route: String },
    #[serde(rename = "cmd.ok")]
    CmdOk { cmd: String },
    #[serde(rename = "git.trackedOnly")]
    GitTrackedOnly {
        dir: String,
        glob: String,
        allow: Vec<String>,
    },
    #[serde(rename = "doc.section")]
    DocSection { path: String, title: String },
    #[serde(rename = "doc.contains")]
    DocContains { path: String, text: String },
    #[serde(rename = "doc.contains_fuzzy")]
    DocContainsFuzzy {
        path: String,
        text: String,
        threshold: f64,
        #[serde(default = "gating")]
        gate: bool,
    },
    #[serde(rename = "artifact.exists")]
    ArtifactExists { path: String },
}

fn gating() -> bool {
    true
}

impl Check {
    pub fn command(&self) -> Option<&str> {
        match self {
            Check::CmdOk { cmd } => Some(cmd),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Check::FileExists { .. } => "file.exists",
            Check::FileContains { .. } => "file.contains",
            Check::RouteExists { .. } => "route.exists",
            Check::CmdOk { .. } => "cmd.ok",
            Check::GitTrackedOnly { .. } => "git.trackedOnly",
            Check::DocSection { .. } => "doc.section",
            Check::DocContains { .. } => "doc.contains",
            Check::DocContainsFuzzy { .. } => "doc.contains_fuzzy",
            Check::ArtifactExists { .. } => "artifact.exists",
        }
    }
}

/// Serialize a plan in its persisted form (pretty JSON, trailing newline).
pub fn to_canonical_json(plan: &Plan) -> serde_json::Result<String> {
    let mut buf = serde_json::to_string_pretty(plan)?;
    buf.push('\n');
    Ok(buf)
}
