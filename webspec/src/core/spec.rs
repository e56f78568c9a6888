//! WebSpec document types.
//!
//! The shape is validated by JSON Schema before deserialization, so these
//! structs only describe fields; they do not re-check constraints such as the
//! `steps` requirement of the current shape. Step `actions` and `ensures` stay
//! raw here and are decoded one by one by the plan builder, which turns decode
//! failures into diagnostics instead of aborting the parse.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default directory the application lives in when `workspace` is omitted.
pub const DEFAULT_APP_DIR: &str = "app";

/// Which accepted shape a spec was written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecShape {
    /// `version: 1`; `steps` optional, no intent/effects/decisions.
    Legacy,
    /// `version: 2`; explicit steps, claims and decisions are enforced.
    Current,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSpec {
    pub version: u32,
    pub target: String,
    pub project: Project,
    pub workspace: Option<Workspace>,
    pub ui: Option<UiSpec>,
    #[serde(default)]
    pub routes: Vec<String>,
    pub quality: Option<Quality>,
    pub steps: Option<Vec<StepSpec>>,
    pub intent: Option<Intent>,
    pub docs: Option<Docs>,
    pub effects: Option<Effects>,
    pub artifacts: Option<Artifacts>,
    #[serde(default)]
    pub assumptions: Vec<Assumption>,
    #[serde(default)]
    pub decisions: Vec<DecisionRecord>,
}

impl WebSpec {
    pub fn shape(&self) -> SpecShape {
        if self.version >= 2 {
            SpecShape::Current
        } else {
            SpecShape::Legacy
        }
    }

    /// Workspace-relative directory of the application.
    pub fn app_dir(&self) -> &str {
        self.workspace
            .as_ref()
            .map(|ws| ws.dir.as_str())
            .unwrap_or(DEFAULT_APP_DIR)
    }

    pub fn invariants(&self) -> &[Invariant] {
        self.intent
            .as_ref()
            .map(|intent| intent.invariants.as_slice())
            .unwrap_or(&[])
    }

    pub fn write_scopes(&self) -> Option<&[String]> {
        self.effects
            .as_ref()
            .map(|effects| effects.write_scopes.as_slice())
            .filter(|scopes| !scopes.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSpec {
    pub library: String,
    #[serde(default)]
    pub components: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality {
    #[serde(default)]
    pub gates: Vec<String>,
}

/// User-authored step with raw actions and ensures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    pub id: String,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub actions: Vec<Value>,
    #[serde(default)]
    pub ensures: Vec<Value>,
    #[serde(default)]
    pub claims: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
}

/// Closed set of step actions. Each is a single-key object, e.g. `{"run": "npm ci"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub enum Action {
    Run(String),
    WriteFile(WriteFileAction),
    AppendFile(AppendFileAction),
    Macro(MacroCall),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteFileAction {
    pub path: String,
    pub content: Option<String>,
    pub template: Option<String>,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppendFileAction {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacroCall {
    pub name: String,
    #[serde(default)]
    pub args: BTreeMap<String, Value>,
}

/// Closed set of step proof obligations; maps 1:1 onto plan checks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub enum Ensure {
    FileExists(String),
    FileContains {
        path: String,
        text: String,
    },
    RouteExists(String),
    CmdOk(String),
    GitTrackedOnly {
        #[serde(default = "current_dir")]
        dir: String,
        glob: String,
        #[serde(default)]
        allow: Vec<String>,
    },
    DocSection {
        path: String,
        title: String,
    },
    DocContains {
        path: String,
        text: String,
    },
    DocContainsFuzzy {
        path: String,
        text: String,
        threshold: Option<f64>,
        gate: Option<bool>,
    },
    ArtifactExists(String),
}

fn current_dir() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub summary: String,
    #[serde(default)]
    pub invariants: Vec<Invariant>,
    #[serde(default)]
    pub non_goals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invariant {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Docs {
    #[serde(default)]
    pub required_files: Vec<String>,
    #[serde(default)]
    pub sections: Vec<DocSection>,
    #[serde(default)]
    pub expect: Vec<DocExpectation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocSection {
    pub path: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocExpectation {
    pub path: String,
    pub text: String,
    #[serde(default, rename = "match")]
    pub matching: MatchMode,
    pub threshold: Option<f64>,
    pub gate: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Literal,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effects {
    #[serde(default)]
    pub write_scopes: Vec<String>,
    #[serde(default)]
    pub expansion: ExpansionPolicy,
}

/// How far writes may reach beyond what the manifest allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionPolicy {
    /// Writes must also fall inside the spec's own `writeScopes`.
    Explicit,
    /// Manifest globs alone decide.
    #[default]
    Manifest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    #[serde(default)]
    pub required: Vec<Artifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub path: String,
    #[serde(default)]
    pub must_write: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assumption {
    pub id: String,
    pub text: String,
    pub status: AssumptionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssumptionStatus {
    Verified,
    Unverified,
}

/// Formal, confidence-scored answer to a design question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub rationale: String,
    pub status: DecisionStatus,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Provisional,
    Final,
}
