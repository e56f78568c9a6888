//! Shape validation for specs, manifests and persisted plans (JSON Schema, Draft 2020-12).
//!
//! Schemas are bundled at build time from `schemas/`. Shape failures are fatal:
//! a spec yields a single `E001_PARSE`, a manifest a single `E101_BAD_MANIFEST`.

use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use jsonschema::{Draft, Validator};
use serde_json::Value;

use crate::core::diagnostics::{Code, Diagnostic};
use crate::core::manifest::StackManifest;
use crate::core::plan::{PLAN_LANG, Plan};
use crate::core::spec::WebSpec;

const SPEC_V1_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/webspec/v1.schema.json"
));
const SPEC_V2_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/webspec/v2.schema.json"
));
const MANIFEST_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/manifest/v1.schema.json"
));
const PLAN_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/plan/v1.schema.json"
));

static SPEC_V1: LazyLock<Validator> = LazyLock::new(|| bundled_validator(SPEC_V1_SCHEMA));
static SPEC_V2: LazyLock<Validator> = LazyLock::new(|| bundled_validator(SPEC_V2_SCHEMA));
static MANIFEST: LazyLock<Validator> = LazyLock::new(|| bundled_validator(MANIFEST_SCHEMA));
static PLAN: LazyLock<Validator> = LazyLock::new(|| bundled_validator(PLAN_SCHEMA));

fn bundled_validator(raw: &str) -> Validator {
    let schema: Value = serde_json::from_str(raw).expect("bundled schema should be valid json");
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .expect("bundled schema should compile")
}

/// Parse structured text: JSON when it opens with `{`, YAML otherwise.
pub fn parse_structured(text: &str) -> Result<Value> {
    if text.trim_start().starts_with('{') {
        return serde_json::from_str(text).map_err(|err| anyhow!("invalid JSON: {err}"));
    }
    serde_yaml::from_str(text).map_err(|err| anyhow!("invalid YAML: {err}"))
}

/// Parse spec text and validate it against the shape named by its `version`.
pub fn parse_spec(text: &str) -> Result<WebSpec, Diagnostic> {
    let value = parse_structured(text)
        .map_err(|err| Diagnostic::new(Code::Parse, format!("cannot parse spec: {err}")))?;

    let version = value.get("version").and_then(Value::as_u64);
    let validator: &Validator = match version {
        Some(1) => &*SPEC_V1,
        Some(2) => &*SPEC_V2,
        Some(other) => {
            return Err(
                Diagnostic::new(Code::Parse, format!("unsupported spec version {other}"))
                    .with_path("version")
                    .with_hint("accepted versions are 1 (legacy) and 2"),
            );
        }
        None => {
            return Err(
                Diagnostic::new(Code::Parse, "spec is missing an integer `version`")
                    .with_path("version")
                    .with_hint("add `version: 2` to opt into the current shape"),
            );
        }
    };

    let messages = schema_errors(validator, &value);
    if !messages.is_empty() {
        return Err(Diagnostic::new(
            Code::Parse,
            format!(
                "spec does not match the v{} shape: {}",
                version.unwrap_or_default(),
                messages.join("; ")
            ),
        ));
    }

    serde_json::from_value(value)
        .map_err(|err| Diagnostic::new(Code::Parse, format!("cannot decode spec: {err}")))
}

/// Validate a raw registry entry and decode it as a manifest.
pub fn parse_manifest(target: &str, value: Value) -> Result<StackManifest, Diagnostic> {
    let messages = schema_errors(&MANIFEST, &value);
    if !messages.is_empty() {
        return Err(Diagnostic::new(
            Code::BadManifest,
            format!(
                "manifest for target '{target}' is invalid: {}",
                messages.join("; ")
            ),
        ));
    }
    serde_json::from_value(value).map_err(|err| {
        Diagnostic::new(
            Code::BadManifest,
            format!("cannot decode manifest for target '{target}': {err}"),
        )
    })
}

/// Validate a persisted plan against its own shape and decode it.
pub fn parse_plan_value(value: Value) -> Result<Plan> {
    let messages = schema_errors(&PLAN, &value);
    if !messages.is_empty() {
        return Err(anyhow!(
            "plan schema validation failed: {}",
            messages.join("; ")
        ));
    }
    let plan: Plan = serde_json::from_value(value).map_err(|err| anyhow!("decode plan: {err}"))?;
    if plan.lang != PLAN_LANG {
        return Err(anyhow!(
            "unsupported plan language '{}' (expected '{PLAN_LANG}')",
            plan.lang
        ));
    }
    Ok(plan)
}

fn schema_errors(validator: &Validator, instance: &Value) -> Vec<String> {
    validator
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect()
}
