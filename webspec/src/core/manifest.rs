//! Stack manifest: per-target write policy, command policy, macros and routing semantics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::path::join_rel;

/// Macro the legacy program expands to scaffold a project.
pub const SCAFFOLD_MACRO: &str = "stack.scaffold";
/// Optional macro the legacy program expands when `ui` is declared.
pub const UI_SETUP_MACRO: &str = "ui.setup";
/// Per-route macro for file-based routing stacks.
pub const ROUTING_PAGE_MACRO: &str = "routing.page";
/// Whole-table macro for router-table stacks.
pub const ROUTING_TABLE_MACRO: &str = "routing.table";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackManifest {
    #[serde(default)]
    pub id: Option<String>,
    pub preset_version: String,
    pub effects_policy: EffectsPolicy,
    pub commands: CommandsPolicy,
    #[serde(default)]
    pub macros: BTreeMap<String, MacroDef>,
    #[serde(default)]
    pub semantics: Semantics,
}

impl StackManifest {
    pub fn macro_def(&self, name: &str) -> Option<&MacroDef> {
        self.macros.get(name)
    }

    pub fn has_macro(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectsPolicy {
    #[serde(default)]
    pub allow_write: Vec<String>,
    #[serde(default)]
    pub deny_write: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandsPolicy {
    #[serde(default)]
    pub allow_prefixes: Vec<String>,
    #[serde(default)]
    pub deny_substrings: Vec<String>,
}

/// Named, typed, templated action sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroDef {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub args: BTreeMap<String, ArgType>,
    pub expands_to: Vec<MacroAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgType {
    #[serde(rename = "path")]
    Path,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "string[]")]
    StringList,
    #[serde(rename = "json")]
    Json,
}

impl ArgType {
    pub fn as_str(self) -> &'static str {
        match self {
            ArgType::Path => "path",
            ArgType::String => "string",
            ArgType::StringList => "string[]",
            ArgType::Json => "json",
        }
    }
}

/// Templated action inside a macro body; string fields may hold `${arg}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub enum MacroAction {
    Run(String),
    WriteFile {
        path: String,
        content: String,
    },
    AppendFile {
        path: String,
        content: String,
    },
    WriteTemplate {
        path: String,
        template: String,
        #[serde(default)]
        vars: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Semantics {
    /// Project manifest file produced by scaffolding (e.g. `package.json`).
    #[serde(default = "default_project_manifest")]
    pub project_manifest: String,
    #[serde(default)]
    pub routing: Option<Routing>,
}

impl Default for Semantics {
    fn default() -> Self {
        Self {
            project_manifest: default_project_manifest(),
            routing: None,
        }
    }
}

fn default_project_manifest() -> String {
    "package.json".to_string()
}

/// How a declared route maps onto files in the app directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "camelCase")]
pub enum Routing {
    /// Each route is a page file under `pagesDir` (`/about` → `<pagesDir>/about/<pageFile>`).
    #[serde(rename_all = "camelCase")]
    FileBased { pages_dir: String, page_file: String },
    /// All routes live in one generated table file that quotes each route.
    #[serde(rename_all = "camelCase")]
    RouterTable { routes_file: String },
}

impl Routing {
    pub fn macro_name(&self) -> &'static str {
        match self {
            Routing::FileBased { .. } => ROUTING_PAGE_MACRO,
            Routing::RouterTable { .. } => ROUTING_TABLE_MACRO,
        }
    }

    /// Page file for `route` under a file-based router.
    pub fn page_path(pages_dir: &str, page_file: &str, app_dir: &str, route: &str) -> String {
        let mut parts = vec![app_dir, pages_dir];
        parts.extend(route.split('/').filter(|segment| !segment.is_empty()));
        parts.push(page_file);
        join_rel(&parts)
    }
}
