//! `{{name}}` template rendering for `WRITE_TEMPLATE` ops.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.-]*)\s*\}\}").expect("var regex"));

/// Substitute `{{name}}` from `vars`. Unknown names are left as written, so
/// JSX or other brace-heavy sources pass through untouched.
pub fn render(source: &str, vars: &BTreeMap<String, String>) -> String {
    VAR.replace_all(source, |caps: &Captures<'_>| {
        vars.get(&caps[1])
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
