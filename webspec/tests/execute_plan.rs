//! Compile-then-execute tests.
//!
//! Plans come straight out of `compile` and are applied to a scratch git
//! repository with a scripted command runner, so no real toolchain runs.

use webspec::compile::compile;
use webspec::core::plan::{Op, Plan};
use webspec::execute::{ExecContext, ExecError, execute_plan};
use webspec::io::plan_store::{load_plan, write_plan};
use webspec::test_support::{ScriptedRunner, TestRepo, fixture_registry, valid_spec};

fn compiled_plan() -> Plan {
    let text = serde_json::to_string(&valid_spec()).expect("spec json");
    let result = compile(&text, &fixture_registry());
    assert!(result.ok, "diagnostics: {:?}", result.diagnostics);
    result.plan.expect("plan")
}

#[test]
fn compiled_plan_runs_to_completion() {
    let repo = TestRepo::new().expect("repo");
    let registry = fixture_registry();
    let runner = ScriptedRunner::succeeding();
    let ctx = ExecContext {
        registry: &registry,
        templates: &registry,
        runner: &runner,
        workdir: repo.path(),
    };

    let mut out = Vec::new();
    let outcome = execute_plan(&compiled_plan(), &ctx, &mut out).expect("run");

    assert_eq!(outcome.steps_run, 3);
    assert!(outcome.warnings.is_empty());
    assert!(repo.read("README.md").expect("readme").contains("## Usage"));
    assert_eq!(
        runner.commands(),
        vec!["npm run build".to_string(), "npm run build".to_string()]
    );
    let log = String::from_utf8(out).expect("utf8");
    assert!(log.contains("==> step readme\n==> step build\n==> step verify_docs\n"));
}

#[test]
fn persisted_plan_round_trips_through_the_store() {
    let repo = TestRepo::new().expect("repo");
    let path = repo.join(".webspec/plan.json");
    let plan = compiled_plan();
    write_plan(&path, &plan).expect("write plan");

    assert_eq!(load_plan(&path).expect("load plan"), plan);
}

#[test]
fn failing_build_stops_before_docs_are_verified() {
    let repo = TestRepo::new().expect("repo");
    let registry = fixture_registry();
    let runner = ScriptedRunner::with_codes(vec![1]);
    let ctx = ExecContext {
        registry: &registry,
        templates: &registry,
        runner: &runner,
        workdir: repo.path(),
    };

    let mut out = Vec::new();
    let err = execute_plan(&compiled_plan(), &ctx, &mut out).expect_err("build fails");

    match err {
        ExecError::StepFailed { step, .. } => assert_eq!(step, "build"),
        other => panic!("unexpected error: {other}"),
    }
    let log = String::from_utf8(out).expect("utf8");
    assert!(!log.contains("verify_docs"));
    // Effects of earlier steps are kept.
    assert!(repo.join("README.md").exists());
}

#[test]
fn tampered_plan_is_rejected_before_any_write() {
    let repo = TestRepo::new().expect("repo");
    let registry = fixture_registry();
    let runner = ScriptedRunner::succeeding();
    let ctx = ExecContext {
        registry: &registry,
        templates: &registry,
        runner: &runner,
        workdir: repo.path(),
    };

    let mut plan = compiled_plan();
    plan.steps[1].ops.push(Op::Run {
        cmd: "rm -rf /".to_string(),
    });

    let err = execute_plan(&plan, &ctx, &mut Vec::new()).expect_err("rejected");
    assert!(matches!(err, ExecError::Rejected(_)));
    assert!(!repo.join("README.md").exists());
    assert!(runner.commands().is_empty());
}
