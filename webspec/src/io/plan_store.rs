//! Plan load/save helpers with schema validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::core::plan::{Plan, to_canonical_json};
use crate::core::schema::parse_plan_value;

/// Load a persisted plan and re-validate it against the plan schema.
pub fn load_plan(path: &Path) -> Result<Plan> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read plan {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse plan {}", path.display()))?;
    parse_plan_value(value).with_context(|| format!("validate plan {}", path.display()))
}

/// Write a plan in its canonical persisted form, creating parent directories.
pub fn write_plan(path: &Path, plan: &Plan) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let buf = to_canonical_json(plan).context("serialize plan")?;
    fs::write(path, buf).with_context(|| format!("write plan {}", path.display()))
}
