//! Macro expansion: manifest macros → primitive plan ops.
//!
//! `${name}` substitutes a scalar (lists are joined by spaces), `${name...}`
//! substitutes a space-joined list, and `json` arguments are serialized first.
//! Placeholders that do not name a declared argument are left verbatim so
//! shell variables such as `${HOME}` pass through untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::core::diagnostics::{Code, Diagnostic};
use crate::core::manifest::{ArgType, MacroAction, StackManifest};
use crate::core::plan::Op;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(\.\.\.)?\}").expect("placeholder regex")
});

/// Ops produced by one expansion plus anything worth reporting about it.
#[derive(Debug, Default)]
pub struct Expansion {
    pub ops: Vec<Op>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Expand `name` with `args` against the manifest's macro table.
///
/// `location` is used as the diagnostic path (e.g. `steps[0].actions[1]`).
pub fn expand_macro(
    manifest: &StackManifest,
    name: &str,
    args: &BTreeMap<String, Value>,
    location: &str,
) -> Expansion {
    let Some(def) = manifest.macro_def(name) else {
        return Expansion {
            ops: Vec::new(),
            diagnostics: vec![
                Diagnostic::new(Code::UnknownMacro, format!("unknown macro '{name}'"))
                    .with_path(location)
                    .with_hint(known_macros_hint(manifest)),
            ],
        };
    };

    let mut diagnostics = Vec::new();
    let mut bound = BTreeMap::new();
    for (arg, ty) in &def.args {
        let rendered = match args.get(arg) {
            None => {
                diagnostics.push(
                    Diagnostic::new(
                        Code::MissingMacroArg,
                        format!("macro '{name}' is missing argument '{arg}'"),
                    )
                    .with_path(location),
                );
                BoundArg::scalar(String::new())
            }
            Some(value) => match bind_arg(*ty, value) {
                Some(bound) => bound,
                None => {
                    diagnostics.push(
                        Diagnostic::new(
                            Code::MacroArgType,
                            format!(
                                "macro '{name}' argument '{arg}' expects {}, got {}",
                                ty.as_str(),
                                json_type(value)
                            ),
                        )
                        .with_path(location),
                    );
                    BoundArg::scalar(String::new())
                }
            },
        };
        bound.insert(arg.as_str(), rendered);
    }

    let ops = def
        .expands_to
        .iter()
        .map(|action| instantiate(action, &bound))
        .collect();
    Expansion { ops, diagnostics }
}

/// A bound argument in both its scalar and list renderings.
#[derive(Debug, Clone)]
struct BoundArg {
    scalar: String,
    spread: String,
}

impl BoundArg {
    fn scalar(value: String) -> Self {
        Self {
            spread: value.clone(),
            scalar: value,
        }
    }
}

fn bind_arg(ty: ArgType, value: &Value) -> Option<BoundArg> {
    match ty {
        ArgType::Path | ArgType::String => match value {
            Value::String(s) => Some(BoundArg::scalar(s.clone())),
            Value::Number(n) => Some(BoundArg::scalar(n.to_string())),
            Value::Bool(b) => Some(BoundArg::scalar(b.to_string())),
            _ => None,
        },
        ArgType::StringList => {
            let items = value
                .as_array()?
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()?;
            Some(BoundArg::scalar(items.join(" ")))
        }
        ArgType::Json => serde_json::to_string(value).ok().map(BoundArg::scalar),
    }
}

fn instantiate(action: &MacroAction, args: &BTreeMap<&str, BoundArg>) -> Op {
    let sub = |text: &str| substitute(text, args);
    match action {
        MacroAction::Run(cmd) => Op::Run { cmd: sub(cmd) },
        MacroAction::WriteFile { path, content } => Op::WriteFile {
            path: sub(path),
            content: sub(content),
        },
        MacroAction::AppendFile { path, content } => Op::AppendFile {
            path: sub(path),
            content: sub(content),
        },
        MacroAction::WriteTemplate {
            path,
            template,
            vars,
        } => Op::WriteTemplate {
            path: sub(path),
            template: sub(template),
            vars: vars
                .iter()
                .map(|(key, value)| (key.clone(), sub(value)))
                .collect(),
        },
    }
}

fn substitute(text: &str, args: &BTreeMap<&str, BoundArg>) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            match args.get(name) {
                Some(arg) if caps.get(2).is_some() => arg.spread.clone(),
                Some(arg) => arg.scalar.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn known_macros_hint(manifest: &StackManifest) -> String {
    let names: BTreeSet<&str> = manifest.macros.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "this target declares no macros".to_string();
    }
    format!(
        "known macros: {}",
        names.into_iter().collect::<Vec<_>>().join(", ")
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
