//! Guardrail passes over built plan steps.
//!
//! Each pass is pure and returns its own diagnostics; the compile orchestrator
//! concatenates them in a fixed order. Locations (`steps[i].ops[j]`) index
//! into the built plan, not the authored spec, because macros fan out.

use std::collections::{BTreeSet, HashSet};

use crate::core::decision_tree::{DecisionTree, DecisionTreeError};
use crate::core::diagnostics::{Code, Diagnostic};
use crate::core::path::normalize;
use crate::core::plan::PlanStep;
use crate::core::policy::{CommandPolicy, CommandViolation, WritePolicy, WriteViolation};
use crate::core::spec::{
    AssumptionStatus, DecisionRecord, DecisionStatus, ExpansionPolicy, SpecShape, WebSpec,
};

/// Resolves decision ids, through the tree when it built and by first
/// occurrence in the spec otherwise.
pub struct DecisionLookup<'a> {
    tree: Option<&'a DecisionTree>,
    records: &'a [DecisionRecord],
}

impl<'a> DecisionLookup<'a> {
    pub fn new(tree: Option<&'a DecisionTree>, records: &'a [DecisionRecord]) -> Self {
        Self { tree, records }
    }

    pub fn get(&self, id: &str) -> Option<&'a DecisionRecord> {
        match self.tree {
            Some(tree) => tree.get(id),
            None => self.records.iter().find(|record| record.id == id),
        }
    }
}

/// Write destinations against manifest globs, spec scopes and the workspace root.
pub fn check_effects(spec: &WebSpec, policy: &WritePolicy, steps: &[PlanStep]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let explicit = spec
        .effects
        .as_ref()
        .is_some_and(|effects| effects.expansion == ExpansionPolicy::Explicit);

    let scoped;
    let policy = match spec.write_scopes() {
        None => {
            if explicit {
                diagnostics.push(
                    Diagnostic::new(
                        Code::EffectsScopeRequired,
                        "effects.expansion is 'explicit' but no writeScopes are declared",
                    )
                    .with_path("effects.writeScopes")
                    .with_hint("list the globs this spec may write, or use expansion: manifest"),
                );
            }
            policy
        }
        Some(scopes) => match policy.clone().with_scopes(scopes) {
            Ok(with_scopes) => {
                scoped = with_scopes;
                &scoped
            }
            Err(err) => {
                diagnostics.push(
                    Diagnostic::new(Code::BadWriteScope, format!("invalid write scope: {err}"))
                        .with_path("effects.writeScopes"),
                );
                policy
            }
        },
    };

    for (i, step) in steps.iter().enumerate() {
        for (j, op) in step.ops.iter().enumerate() {
            let Some(target) = op.write_target() else {
                continue;
            };
            let location = format!("steps[{i}].ops[{j}]");
            for violation in policy.violations(target) {
                let diagnostic = match violation {
                    WriteViolation::Escapes => Diagnostic::new(
                        Code::WriteOutside,
                        format!(
                            "step '{}' writes '{target}', which escapes the workspace",
                            step.id
                        ),
                    )
                    .with_hint("write paths must be relative and must not contain '..'"),
                    WriteViolation::Outside => Diagnostic::new(
                        Code::WriteOutside,
                        format!(
                            "step '{}' writes '{target}', which matches no allowed glob",
                            step.id
                        ),
                    ),
                    WriteViolation::Denied { glob } => Diagnostic::new(
                        Code::DeniedPath,
                        format!(
                            "step '{}' writes '{target}', which matches denied glob '{glob}'",
                            step.id
                        ),
                    ),
                    WriteViolation::OutOfScope => Diagnostic::new(
                        Code::ScopeViolation,
                        format!(
                            "step '{}' writes '{target}', outside the declared write scopes",
                            step.id
                        ),
                    ),
                };
                diagnostics.push(diagnostic.with_path(location.clone()));
            }
        }
    }
    diagnostics
}

/// `RUN` ops and `cmd.ok` checks against the command allow/deny lists.
pub fn check_commands(policy: &CommandPolicy, steps: &[PlanStep]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (i, step) in steps.iter().enumerate() {
        let ops = step
            .ops
            .iter()
            .enumerate()
            .filter_map(|(j, op)| op.command().map(|cmd| (format!("steps[{i}].ops[{j}]"), cmd)));
        let checks = step.checks.iter().enumerate().filter_map(|(j, check)| {
            check
                .command()
                .map(|cmd| (format!("steps[{i}].checks[{j}]"), cmd))
        });
        for (location, cmd) in ops.chain(checks) {
            for violation in policy.violations(cmd) {
                let diagnostic = match violation {
                    CommandViolation::NotAllowed { token } => Diagnostic::new(
                        Code::CmdNotAllowed,
                        format!(
                            "step '{}' runs '{cmd}' but '{token}' is not an allowed prefix",
                            step.id
                        ),
                    )
                    .with_hint(format!(
                        "allowed prefixes: {}",
                        policy.allowed_prefixes().collect::<Vec<_>>().join(", ")
                    )),
                    CommandViolation::DeniedSubstring { needle } => Diagnostic::new(
                        Code::CmdDeniedSubstring,
                        format!(
                            "step '{}' runs '{cmd}', which contains denied '{needle}'",
                            step.id
                        ),
                    ),
                };
                diagnostics.push(diagnostic.with_path(location.clone()));
            }
        }
    }
    diagnostics
}

/// Every step with ops carries at least one check.
pub fn check_proof_obligations(steps: &[PlanStep]) -> Vec<Diagnostic> {
    steps
        .iter()
        .enumerate()
        .filter(|(_, step)| step.has_ops() && step.checks.is_empty())
        .map(|(i, step)| {
            Diagnostic::new(
                Code::StepNoEnsures,
                format!("step '{}' has ops but no checks", step.id),
            )
            .with_path(format!("steps[{i}]"))
            .with_hint("add at least one `ensures` entry")
        })
        .collect()
}

/// Claims against declared invariants. Only enforced for the current shape.
pub fn check_claims(spec: &WebSpec, steps: &[PlanStep]) -> Vec<Diagnostic> {
    if spec.shape() != SpecShape::Current {
        return Vec::new();
    }
    let invariants: BTreeSet<&str> = spec.invariants().iter().map(|inv| inv.id.as_str()).collect();
    if invariants.is_empty() {
        if steps.iter().any(PlanStep::has_ops) {
            return vec![
                Diagnostic::new(
                    Code::MissingInvariants,
                    "steps have ops but intent declares no invariants",
                )
                .with_path("intent.invariants"),
            ];
        }
        return Vec::new();
    }

    let mut diagnostics = Vec::new();
    let mut claimed = HashSet::new();
    for (i, step) in steps.iter().enumerate() {
        if step.has_ops() && step.claims.is_empty() {
            diagnostics.push(
                Diagnostic::new(
                    Code::StepNoClaims,
                    format!("step '{}' has ops but claims no invariant", step.id),
                )
                .with_path(format!("steps[{i}]")),
            );
        }
        for claim in &step.claims {
            if invariants.contains(claim.as_str()) {
                claimed.insert(claim.as_str());
            } else {
                diagnostics.push(
                    Diagnostic::new(
                        Code::UnknownClaim,
                        format!("step '{}' claims unknown invariant '{claim}'", step.id),
                    )
                    .with_path(format!("steps[{i}].claims")),
                );
            }
        }
    }
    for invariant in invariants {
        if !claimed.contains(invariant) {
            diagnostics.push(
                Diagnostic::new(
                    Code::UnclaimedInvariant,
                    format!("invariant '{invariant}' is not claimed by any step"),
                )
                .with_path("intent.invariants"),
            );
        }
    }
    diagnostics
}

/// Duplicate ids, assumption backing and step decision references.
pub fn check_decisions(
    spec: &WebSpec,
    lookup: &DecisionLookup<'_>,
    steps: &[PlanStep],
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let mut seen = HashSet::new();
    for (i, record) in spec.decisions.iter().enumerate() {
        if !seen.insert(record.id.as_str()) {
            diagnostics.push(
                Diagnostic::new(
                    Code::DecisionDuplicate,
                    format!("decision id '{}' is declared more than once", record.id),
                )
                .with_path(format!("decisions[{i}]")),
            );
        }
    }

    for (i, assumption) in spec.assumptions.iter().enumerate() {
        let location = format!("assumptions[{i}]");
        if assumption.status != AssumptionStatus::Verified {
            diagnostics.push(
                Diagnostic::new(
                    Code::UnverifiedAssumption,
                    format!("assumption '{}' is not verified", assumption.id),
                )
                .with_path(location.clone()),
            );
        }
        match lookup.get(&assumption.id) {
            None => diagnostics.push(
                Diagnostic::new(
                    Code::AssumptionNoDecision,
                    format!("assumption '{}' has no decision with the same id", assumption.id),
                )
                .with_path(location),
            ),
            Some(record) if record.status != DecisionStatus::Final => diagnostics.push(
                Diagnostic::new(
                    Code::AssumptionDecisionNotFinal,
                    format!("decision backing assumption '{}' is not final", assumption.id),
                )
                .with_path(location),
            ),
            Some(_) => {}
        }
    }

    for (i, step) in steps.iter().enumerate() {
        for id in &step.decisions {
            match lookup.get(id) {
                None => diagnostics.push(
                    Diagnostic::new(
                        Code::StepDecisionMissing,
                        format!("step '{}' references missing decision '{id}'", step.id),
                    )
                    .with_path(format!("steps[{i}].decisions")),
                ),
                Some(record) if record.status != DecisionStatus::Final => diagnostics.push(
                    Diagnostic::new(
                        Code::StepDecisionNotFinal,
                        format!("step '{}' references non-final decision '{id}'", step.id),
                    )
                    .with_path(format!("steps[{i}].decisions")),
                ),
                Some(_) => {}
            }
        }
    }
    diagnostics
}

/// Diagnostic for a failed decision tree build. Duplicates are left to
/// [`check_decisions`], which reports every repeated id.
pub fn decision_tree_diagnostic(err: &DecisionTreeError) -> Option<Diagnostic> {
    match err {
        DecisionTreeError::DuplicateId(_) => None,
        DecisionTreeError::MissingParent { .. } => Some(
            Diagnostic::new(Code::DecisionParentMissing, err.to_string()).with_path("decisions"),
        ),
        DecisionTreeError::Cycle { .. } => {
            Some(Diagnostic::new(Code::DecisionCycle, err.to_string()).with_path("decisions"))
        }
    }
}

/// Must-write artifacts appear as a write target somewhere in the plan.
pub fn check_artifacts(spec: &WebSpec, steps: &[PlanStep]) -> Vec<Diagnostic> {
    let Some(artifacts) = &spec.artifacts else {
        return Vec::new();
    };
    let written: HashSet<&str> = steps
        .iter()
        .flat_map(|step| step.ops.iter())
        .filter_map(|op| op.write_target())
        .map(normalize)
        .collect();
    artifacts
        .required
        .iter()
        .enumerate()
        .filter(|(_, artifact)| artifact.must_write && !written.contains(normalize(&artifact.path)))
        .map(|(i, artifact)| {
            Diagnostic::new(
                Code::ArtifactNotWritten,
                format!(
                    "artifact '{}' must be written but no step writes it",
                    artifact.path
                ),
            )
            .with_path(format!("artifacts.required[{i}]"))
        })
        .collect()
}

/// `requires` entries should name an earlier step; steps still run in list order.
pub fn check_requires_order(steps: &[PlanStep]) -> Vec<Diagnostic> {
    let mut earlier = HashSet::new();
    let mut diagnostics = Vec::new();
    for (i, step) in steps.iter().enumerate() {
        for required in &step.requires {
            if !earlier.contains(required.as_str()) {
                diagnostics.push(
                    Diagnostic::new(
                        Code::RequiresOrder,
                        format!(
                            "step '{}' requires '{required}', which is not an earlier step",
                            step.id
                        ),
                    )
                    .with_path(format!("steps[{i}].requires"))
                    .with_hint("steps execute in list order; move the required step earlier"),
                );
            }
        }
        earlier.insert(step.id.as_str());
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::StackManifest;
    use crate::core::plan::{Check, Op};
    use serde_json::{Value, json};

    fn manifest() -> StackManifest {
        serde_json::from_value(json!({
            "presetVersion": "1",
            "effectsPolicy": {"allowWrite": ["app/**", "docs/**"], "denyWrite": ["**/.env"]},
            "commands": {"allowPrefixes": ["npm"], "denySubstrings": ["--force"]}
        }))
        .expect("manifest")
    }

    fn spec(extra: Value) -> WebSpec {
        let mut base = json!({"version": 2, "target": "next", "project": {"name": "demo"}, "steps": []});
        if let (Value::Object(base), Value::Object(extra)) = (&mut base, extra) {
            base.extend(extra);
        }
        serde_json::from_value(base).expect("spec")
    }

    fn writing(id: &str, path: &str) -> PlanStep {
        let mut step = PlanStep::new(id);
        step.ops.push(Op::WriteFile {
            path: path.to_string(),
            content: String::new(),
        });
        step.checks.push(Check::FileExists {
            path: path.to_string(),
        });
        step
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<Code> {
        diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn effects_report_outside_denied_and_escape() {
        let policy = WritePolicy::from_manifest(&manifest()).expect("policy");
        let steps = vec![
            writing("a", "app/ok.ts"),
            writing("b", "src/main.ts"),
            writing("c", "app/.env"),
            writing("d", "../elsewhere"),
        ];
        let diags = check_effects(&spec(json!({})), &policy, &steps);
        assert_eq!(
            codes(&diags),
            vec![Code::WriteOutside, Code::DeniedPath, Code::WriteOutside]
        );
        assert_eq!(diags[0].path.as_deref(), Some("steps[1].ops[0]"));
    }

    #[test]
    fn explicit_expansion_requires_scopes() {
        let policy = WritePolicy::from_manifest(&manifest()).expect("policy");
        let diags = check_effects(
            &spec(json!({"effects": {"expansion": "explicit"}})),
            &policy,
            &[],
        );
        assert_eq!(codes(&diags), vec![Code::EffectsScopeRequired]);
    }

    #[test]
    fn declared_scopes_narrow_writes() {
        let policy = WritePolicy::from_manifest(&manifest()).expect("policy");
        let diags = check_effects(
            &spec(json!({"effects": {"writeScopes": ["docs/**"], "expansion": "explicit"}})),
            &policy,
            &[writing("a", "app/x.ts"), writing("b", "docs/x.md")],
        );
        assert_eq!(codes(&diags), vec![Code::ScopeViolation]);
    }

    #[test]
    fn commands_cover_runs_and_cmd_checks() {
        let policy = CommandPolicy::from_manifest(&manifest());
        let mut step = PlanStep::new("build");
        step.ops.push(Op::Run {
            cmd: "curl example.com".to_string(),
        });
        step.checks.push(Check::CmdOk {
            cmd: "npm install --force".to_string(),
        });
        let diags = check_commands(&policy, &[step]);
        assert_eq!(codes(&diags), vec![Code::CmdNotAllowed, Code::CmdDeniedSubstring]);
        assert_eq!(diags[1].path.as_deref(), Some("steps[0].checks[0]"));
        assert_eq!(diags[0].hint.as_deref(), Some("allowed prefixes: npm"));
    }

    #[test]
    fn steps_with_ops_need_checks() {
        let mut bare = writing("bare", "app/x");
        bare.checks.clear();
        let diags = check_proof_obligations(&[writing("ok", "app/y"), bare, PlanStep::new("empty")]);
        assert_eq!(codes(&diags), vec![Code::StepNoEnsures]);
        assert_eq!(diags[0].path.as_deref(), Some("steps[1]"));
    }

    #[test]
    fn claims_are_matched_against_invariants() {
        let spec = spec(json!({"intent": {"summary": "s", "invariants": [
            {"id": "I1", "text": "one"}, {"id": "I2", "text": "two"}
        ]}}));
        let mut a = writing("a", "app/a");
        a.claims = vec!["I1".to_string(), "I9".to_string()];
        let b = writing("b", "app/b");
        let diags = check_claims(&spec, &[a, b]);
        assert_eq!(
            codes(&diags),
            vec![Code::UnknownClaim, Code::StepNoClaims, Code::UnclaimedInvariant]
        );
        assert!(diags[0].message.contains("'a'"));
        assert!(diags[2].message.contains("I2"));
    }

    #[test]
    fn missing_invariants_short_circuits() {
        let mut a = writing("a", "app/a");
        a.claims = vec!["I1".to_string()];
        let diags = check_claims(&spec(json!({})), &[a]);
        assert_eq!(codes(&diags), vec![Code::MissingInvariants]);
    }

    #[test]
    fn legacy_shape_skips_claims() {
        let legacy: WebSpec = serde_json::from_value(
            json!({"version": 1, "target": "next", "project": {"name": "demo"}}),
        )
        .expect("spec");
        assert!(check_claims(&legacy, &[writing("a", "app/a")]).is_empty());
    }

    #[test]
    fn decisions_and_assumptions_are_cross_checked() {
        let spec = spec(json!({
            "assumptions": [
                {"id": "A1", "text": "node 20", "status": "verified"},
                {"id": "A2", "text": "pnpm", "status": "unverified"},
                {"id": "A3", "text": "ci", "status": "verified"}
            ],
            "decisions": [
                {"id": "A1", "question": "q", "answer": "a", "rationale": "r", "status": "final", "confidence": 0.9},
                {"id": "A3", "question": "q", "answer": "a", "rationale": "r", "status": "provisional", "confidence": 0.4},
                {"id": "A3", "question": "q", "answer": "a", "rationale": "r", "status": "final", "confidence": 0.4}
            ]
        }));
        let mut step = writing("s", "app/a");
        step.decisions = vec!["A1".to_string(), "D9".to_string(), "A3".to_string()];
        let lookup = DecisionLookup::new(None, &spec.decisions);
        let diags = check_decisions(&spec, &lookup, &[step]);
        assert_eq!(
            codes(&diags),
            vec![
                Code::DecisionDuplicate,
                Code::UnverifiedAssumption,
                Code::AssumptionNoDecision,
                Code::AssumptionDecisionNotFinal,
                Code::StepDecisionMissing,
                Code::StepDecisionNotFinal,
            ]
        );
    }

    #[test]
    fn tree_errors_map_to_codes() {
        let cycle = DecisionTreeError::Cycle {
            path: vec!["A".to_string(), "B".to_string(), "A".to_string()],
        };
        assert_eq!(
            decision_tree_diagnostic(&cycle).map(|d| d.code),
            Some(Code::DecisionCycle)
        );
        assert!(decision_tree_diagnostic(&DecisionTreeError::DuplicateId("A".into())).is_none());
    }

    #[test]
    fn must_write_artifacts_need_a_writer() {
        let spec = spec(json!({"artifacts": {"required": [
            {"path": "app/dist/index.html", "mustWrite": true},
            {"path": "./app/a", "mustWrite": true},
            {"path": "app/optional.txt"}
        ]}}));
        let diags = check_artifacts(&spec, &[writing("a", "app/a")]);
        assert_eq!(codes(&diags), vec![Code::ArtifactNotWritten]);
        assert_eq!(diags[0].path.as_deref(), Some("artifacts.required[0]"));
    }

    #[test]
    fn forward_requires_warn() {
        let a = PlanStep::new("a").requiring(&["b"]);
        let b = PlanStep::new("b");
        let c = PlanStep::new("c").requiring(&["a"]);
        let diags = check_requires_order(&[a, b, c]);
        assert_eq!(codes(&diags), vec![Code::RequiresOrder]);
        assert!(!diags[0].is_error());
    }
}
