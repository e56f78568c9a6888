//! Compile pipeline orchestration for `webspec compile`.
//!
//! Parse → resolve target → decision tree → build steps → guardrails. Shape
//! and resolution failures stop the pipeline with a single diagnostic; every
//! later pass runs to completion so one compile reports every defect.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::core::builder::build_steps;
use crate::core::decision_tree::DecisionTree;
use crate::core::diagnostics::{Code, Diagnostic, has_errors};
use crate::core::guardrails::{
    DecisionLookup, check_artifacts, check_claims, check_commands, check_decisions,
    check_effects, check_proof_obligations, check_requires_order, decision_tree_diagnostic,
};
use crate::core::manifest::StackManifest;
use crate::core::plan::{PLAN_LANG, Plan};
use crate::core::policy::{CommandPolicy, WritePolicy};
use crate::core::schema::{parse_manifest, parse_spec};
use crate::io::registry::Registry;

/// Outcome of one compile. `plan` is present iff `ok`.
#[derive(Debug, Clone, Serialize)]
pub struct CompileResult {
    pub ok: bool,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
}

impl CompileResult {
    fn rejected(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            ok: false,
            diagnostics,
            plan: None,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

/// `sha256:` + lowercase hex digest of the raw spec text.
pub fn spec_hash(spec_text: &str) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(spec_text.as_bytes())))
}

/// Resolve and validate the manifest for `target`.
pub fn resolve_manifest(registry: &dyn Registry, target: &str) -> Result<StackManifest, Diagnostic> {
    let raw = match registry.lookup(target) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            return Err(Diagnostic::new(
                Code::UnknownTarget,
                format!("unknown target '{target}'"),
            )
            .with_path("target")
            .with_hint("check the registry directory for a matching target"));
        }
        Err(err) => {
            return Err(Diagnostic::new(
                Code::BadManifest,
                format!("cannot load manifest for target '{target}': {err:#}"),
            ));
        }
    };
    parse_manifest(target, raw)
}

/// Compile spec text into a plan, or into diagnostics explaining why not.
#[instrument(skip_all)]
pub fn compile(spec_text: &str, registry: &dyn Registry) -> CompileResult {
    let spec = match parse_spec(spec_text) {
        Ok(spec) => spec,
        Err(diagnostic) => {
            debug!(%diagnostic, "spec rejected at parse");
            return CompileResult::rejected(vec![diagnostic]);
        }
    };
    info!(target_id = %spec.target, version = spec.version, "compiling spec");

    let manifest = match resolve_manifest(registry, &spec.target) {
        Ok(manifest) => manifest,
        Err(diagnostic) => return CompileResult::rejected(vec![diagnostic]),
    };
    let write_policy = match WritePolicy::from_manifest(&manifest) {
        Ok(policy) => policy,
        Err(err) => {
            return CompileResult::rejected(vec![Diagnostic::new(
                Code::BadManifest,
                format!(
                    "manifest for target '{}' has an invalid write glob: {err}",
                    spec.target
                ),
            )]);
        }
    };
    let command_policy = CommandPolicy::from_manifest(&manifest);

    let mut diagnostics = Vec::new();
    let tree = match DecisionTree::build(&spec.decisions) {
        Ok(tree) => Some(tree),
        Err(err) => {
            warn!(error = %err, "decision tree rejected; falling back to linear lookups");
            diagnostics.extend(decision_tree_diagnostic(&err));
            None
        }
    };
    let lookup = DecisionLookup::new(tree.as_ref(), &spec.decisions);

    let built = build_steps(&spec, &manifest);
    diagnostics.extend(built.diagnostics);
    let steps = built.steps;

    diagnostics.extend(check_effects(&spec, &write_policy, &steps));
    diagnostics.extend(check_commands(&command_policy, &steps));
    diagnostics.extend(check_proof_obligations(&steps));
    diagnostics.extend(check_claims(&spec, &steps));
    diagnostics.extend(check_decisions(&spec, &lookup, &steps));
    diagnostics.extend(check_artifacts(&spec, &steps));
    diagnostics.extend(check_requires_order(&steps));

    if has_errors(&diagnostics) {
        info!(count = diagnostics.len(), "compile rejected");
        return CompileResult::rejected(diagnostics);
    }

    debug!(steps = steps.len(), "plan emitted");
    CompileResult {
        ok: true,
        diagnostics,
        plan: Some(Plan {
            lang: PLAN_LANG.to_string(),
            target: spec.target,
            preset_version: manifest.preset_version,
            spec_hash: spec_hash(spec_text),
            steps,
        }),
    }
}
