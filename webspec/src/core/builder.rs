//! Plan construction: spec steps (or the legacy default program) → plan steps.
//!
//! Two strategies sit behind [`build_steps`] and are picked once per compile:
//! a spec that lists `steps` is translated as written, a legacy spec without
//! them gets the canonical init/scaffold/ui/routes/gates program. Either way a
//! trailing `verify_docs` step collects documentation and artifact checks.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::core::diagnostics::{Code, Diagnostic};
use crate::core::macros::expand_macro;
use crate::core::manifest::{Routing, SCAFFOLD_MACRO, StackManifest, UI_SETUP_MACRO};
use crate::core::path::join_rel;
use crate::core::plan::{Check, DEFAULT_FUZZY_THRESHOLD, Op, PlanStep};
use crate::core::spec::{Action, Ensure, MatchMode, StepSpec, WebSpec, WriteFileAction};

/// Marker file written by the legacy `init` step.
pub const PROJECT_MARKER: &str = ".webspec/project.json";
/// Records which target the workspace was initialized for.
pub const TARGET_MARKER: &str = ".webspec/target";
/// Cache directory that must never be committed.
pub const CACHE_DIR: &str = ".webspec/cache/";
/// Id of the trailing documentation/artifact step.
pub const VERIFY_DOCS_STEP: &str = "verify_docs";

/// Steps produced by a strategy plus the diagnostics raised while building them.
#[derive(Debug, Default)]
pub struct BuiltSteps {
    pub steps: Vec<PlanStep>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BuiltSteps {
    fn push(&mut self, step: PlanStep) {
        self.steps.push(step);
    }

    fn last_id(&self) -> Option<&str> {
        self.steps.last().map(|step| step.id.as_str())
    }

    /// Append `step` requiring the most recently pushed step, if any.
    fn push_chained(&mut self, mut step: PlanStep) {
        if let Some(prev) = self.last_id() {
            step.requires = vec![prev.to_string()];
        }
        self.push(step);
    }
}

/// How the plan's steps are derived from the spec.
#[derive(Debug, Clone, Copy)]
pub enum Strategy<'a> {
    Explicit(&'a [StepSpec]),
    Synthesized,
}

impl<'a> Strategy<'a> {
    pub fn select(spec: &'a WebSpec) -> Self {
        match &spec.steps {
            Some(steps) => Strategy::Explicit(steps),
            None => Strategy::Synthesized,
        }
    }

    pub fn build(self, spec: &WebSpec, manifest: &StackManifest) -> BuiltSteps {
        match self {
            Strategy::Explicit(steps) => build_from_explicit_steps(spec, steps, manifest),
            Strategy::Synthesized => build_synthesized_program(spec, manifest),
        }
    }
}

/// Build every plan step for `spec`, including the trailing `verify_docs` step.
pub fn build_steps(spec: &WebSpec, manifest: &StackManifest) -> BuiltSteps {
    let mut built = Strategy::select(spec).build(spec, manifest);
    let checks = verification_checks(spec);
    if !checks.is_empty() {
        let mut step = PlanStep::new(VERIFY_DOCS_STEP);
        step.checks = checks;
        built.push_chained(step);
    }
    built
}

/// Translate user-authored steps as written.
pub fn build_from_explicit_steps(
    spec: &WebSpec,
    steps: &[StepSpec],
    manifest: &StackManifest,
) -> BuiltSteps {
    let mut built = BuiltSteps::default();
    for (i, step) in steps.iter().enumerate() {
        let mut plan_step = PlanStep::new(&step.id);
        plan_step.requires = step.requires.clone();
        plan_step.claims = step.claims.clone();
        plan_step.decisions = step.decisions.clone();

        for (j, raw) in step.actions.iter().enumerate() {
            let location = format!("steps[{i}].actions[{j}]");
            match serde_json::from_value::<Action>(raw.clone()) {
                Ok(action) => {
                    let (ops, diagnostics) = action_ops(action, manifest, &location);
                    plan_step.ops.extend(ops);
                    built.diagnostics.extend(diagnostics);
                }
                Err(err) => built.diagnostics.push(
                    Diagnostic::new(
                        Code::UnknownAction,
                        format!("step '{}' has an unrecognized action: {err}", step.id),
                    )
                    .with_path(location)
                    .with_hint("actions are one of run, writeFile, appendFile, macro"),
                ),
            }
        }

        for (j, raw) in step.ensures.iter().enumerate() {
            match serde_json::from_value::<Ensure>(raw.clone()) {
                Ok(ensure) => plan_step.checks.push(ensure_check(ensure, spec.app_dir())),
                Err(err) => built.diagnostics.push(
                    Diagnostic::new(
                        Code::UnknownEnsure,
                        format!("step '{}' has an unrecognized ensure: {err}", step.id),
                    )
                    .with_path(format!("steps[{i}].ensures[{j}]")),
                ),
            }
        }

        built.push(plan_step);
    }
    built
}

fn action_ops(
    action: Action,
    manifest: &StackManifest,
    location: &str,
) -> (Vec<Op>, Vec<Diagnostic>) {
    match action {
        Action::Run(cmd) => (vec![Op::Run { cmd }], Vec::new()),
        Action::WriteFile(WriteFileAction {
            path,
            content,
            template,
            vars,
        }) => match (template, content) {
            (Some(template), _) => (
                vec![Op::WriteTemplate {
                    path,
                    template,
                    vars,
                }],
                Vec::new(),
            ),
            (None, Some(content)) => (vec![Op::WriteFile { path, content }], Vec::new()),
            (None, None) => (
                Vec::new(),
                vec![
                    Diagnostic::new(
                        Code::WriteFileNoContent,
                        format!("writeFile '{path}' has neither content nor template"),
                    )
                    .with_path(location),
                ],
            ),
        },
        Action::AppendFile(append) => (
            vec![Op::AppendFile {
                path: append.path,
                content: append.content,
            }],
            Vec::new(),
        ),
        Action::Macro(call) => {
            let expansion = expand_macro(manifest, &call.name, &call.args, location);
            (expansion.ops, expansion.diagnostics)
        }
    }
}

fn ensure_check(ensure: Ensure, app_dir: &str) -> Check {
    match ensure {
        Ensure::FileExists(path) => Check::FileExists { path },
        Ensure::FileContains { path, text } => Check::FileContains { path, text },
        Ensure::RouteExists(route) => Check::RouteExists {
            dir: app_dir.to_string(),
            route,
        },
        Ensure::CmdOk(cmd) => Check::CmdOk { cmd },
        Ensure::GitTrackedOnly { dir, glob, allow } => Check::GitTrackedOnly { dir, glob, allow },
        Ensure::DocSection { path, title } => Check::DocSection { path, title },
        Ensure::DocContains { path, text } => Check::DocContains { path, text },
        Ensure::DocContainsFuzzy {
            path,
            text,
            threshold,
            gate,
        } => Check::DocContainsFuzzy {
            path,
            text,
            threshold: threshold.unwrap_or(DEFAULT_FUZZY_THRESHOLD),
            gate: gate.unwrap_or(true),
        },
        Ensure::ArtifactExists(path) => Check::ArtifactExists { path },
    }
}

/// Canonical program for legacy specs that omit `steps`.
pub fn build_synthesized_program(spec: &WebSpec, manifest: &StackManifest) -> BuiltSteps {
    let dir = spec.app_dir();
    let project_manifest = join_rel(&[dir, &manifest.semantics.project_manifest]);
    let mut built = BuiltSteps::default();

    built.push(init_step(spec));

    if manifest.has_macro(SCAFFOLD_MACRO) {
        let mut step = PlanStep::new("scaffold_web");
        let args = macro_args(json!({"dir": dir, "name": spec.project.name}));
        expand_into(&mut step, &mut built, manifest, SCAFFOLD_MACRO, &args);
        step.checks.push(Check::FileExists {
            path: project_manifest.clone(),
        });
        built.push_chained(step);
    } else {
        built.diagnostics.push(missing_macro(SCAFFOLD_MACRO, "scaffolding"));
    }

    if let Some(ui) = &spec.ui {
        if manifest.has_macro(UI_SETUP_MACRO) {
            let mut step = PlanStep::new("setup_ui");
            let args = macro_args(json!({
                "dir": dir,
                "library": ui.library,
                "components": ui.components,
            }));
            expand_into(&mut step, &mut built, manifest, UI_SETUP_MACRO, &args);
            step.checks.push(Check::FileContains {
                path: project_manifest.clone(),
                text: ui.library.clone(),
            });
            built.push_chained(step);
        } else {
            tracing::debug!(library = %ui.library, "target has no ui.setup macro; skipping ui step");
        }
    }

    if !spec.routes.is_empty() {
        routes_step(spec, manifest, &mut built);
    }

    if let Some(quality) = &spec.quality
        && !quality.gates.is_empty()
    {
        let mut step = PlanStep::new("quality_gates");
        for gate in &quality.gates {
            step.ops.push(Op::Run { cmd: gate.clone() });
            step.checks.push(Check::CmdOk { cmd: gate.clone() });
        }
        built.push_chained(step);
    }

    built
}

fn init_step(spec: &WebSpec) -> PlanStep {
    let marker = json!({
        "name": spec.project.name,
        "description": spec.project.description,
        "target": spec.target,
        "dir": spec.app_dir(),
    });
    let mut step = PlanStep::new("init");
    step.ops = vec![
        Op::WriteFile {
            path: PROJECT_MARKER.to_string(),
            content: format!("{marker:#}\n"),
        },
        Op::WriteFile {
            path: TARGET_MARKER.to_string(),
            content: format!("{}\n", spec.target),
        },
        Op::AppendFile {
            path: ".gitignore".to_string(),
            content: format!("{CACHE_DIR}\n"),
        },
    ];
    step.checks = vec![
        Check::FileExists {
            path: PROJECT_MARKER.to_string(),
        },
        Check::GitTrackedOnly {
            dir: ".".to_string(),
            glob: format!("{CACHE_DIR}**"),
            allow: Vec::new(),
        },
    ];
    step
}

fn routes_step(spec: &WebSpec, manifest: &StackManifest, built: &mut BuiltSteps) {
    let dir = spec.app_dir();
    let Some(routing) = &manifest.semantics.routing else {
        built.diagnostics.push(
            Diagnostic::new(
                Code::MissingMacro,
                format!(
                    "spec declares routes but target '{}' has no routing semantics",
                    spec.target
                ),
            )
            .with_path("routes"),
        );
        return;
    };
    let macro_name = routing.macro_name();
    if !manifest.has_macro(macro_name) {
        built.diagnostics.push(missing_macro(macro_name, "routes"));
        return;
    }

    let mut step = PlanStep::new("routes");
    match routing {
        Routing::FileBased {
            pages_dir,
            page_file,
        } => {
            for route in &spec.routes {
                let file = Routing::page_path(pages_dir, page_file, dir, route);
                let args = macro_args(json!({"dir": dir, "route": route, "file": file}));
                expand_into(&mut step, built, manifest, macro_name, &args);
            }
        }
        Routing::RouterTable { routes_file } => {
            let file = join_rel(&[dir, routes_file]);
            let args = macro_args(json!({"dir": dir, "routes": spec.routes, "file": file}));
            expand_into(&mut step, built, manifest, macro_name, &args);
        }
    }
    for route in &spec.routes {
        step.checks.push(Check::RouteExists {
            dir: dir.to_string(),
            route: route.clone(),
        });
    }
    built.push_chained(step);
}

fn expand_into(
    step: &mut PlanStep,
    built: &mut BuiltSteps,
    manifest: &StackManifest,
    name: &str,
    args: &BTreeMap<String, Value>,
) {
    let location = format!("program.{}", step.id);
    let expansion = expand_macro(manifest, name, args, &location);
    step.ops.extend(expansion.ops);
    built.diagnostics.extend(expansion.diagnostics);
}

fn macro_args(value: Value) -> BTreeMap<String, Value> {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    }
}

fn missing_macro(name: &str, purpose: &str) -> Diagnostic {
    Diagnostic::new(
        Code::MissingMacro,
        format!("target does not define the '{name}' macro required for {purpose}"),
    )
    .with_path(format!("macros.{name}"))
}

/// Checks contributed by `docs` and `artifacts`, in declaration order.
fn verification_checks(spec: &WebSpec) -> Vec<Check> {
    let mut checks = Vec::new();
    if let Some(docs) = &spec.docs {
        checks.extend(
            docs.required_files
                .iter()
                .map(|path| Check::FileExists { path: path.clone() }),
        );
        checks.extend(docs.sections.iter().map(|section| Check::DocSection {
            path: section.path.clone(),
            title: section.title.clone(),
        }));
        checks.extend(docs.expect.iter().map(|expect| match expect.matching {
            MatchMode::Literal => Check::DocContains {
                path: expect.path.clone(),
                text: expect.text.clone(),
            },
            MatchMode::Fuzzy => Check::DocContainsFuzzy {
                path: expect.path.clone(),
                text: expect.text.clone(),
                threshold: expect.threshold.unwrap_or(DEFAULT_FUZZY_THRESHOLD),
                gate: expect.gate.unwrap_or(true),
            },
        }));
    }
    if let Some(artifacts) = &spec.artifacts {
        checks.extend(
            artifacts
                .required
                .iter()
                .map(|artifact| Check::ArtifactExists {
                    path: artifact.path.clone(),
                }),
        );
    }
    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: Value) -> StackManifest {
        serde_json::from_value(value).expect("manifest")
    }

    fn next_manifest() -> StackManifest {
        manifest(json!({
            "presetVersion": "1",
            "effectsPolicy": {"allowWrite": ["**"]},
            "commands": {"allowPrefixes": ["npx", "npm"]},
            "macros": {
                "stack.scaffold": {
                    "args": {"dir": "path", "name": "string"},
                    "expandsTo": [{"run": "npx create-next-app ${dir} --name ${name}"}]
                },
                "routing.page": {
                    "args": {"dir": "path", "route": "string", "file": "path"},
                    "expandsTo": [{"writeFile": {"path": "${file}", "content": "// ${route}\n"}}]
                }
            },
            "semantics": {
                "routing": {"style": "fileBased", "pagesDir": "src/app", "pageFile": "page.tsx"}
            }
        }))
    }

    fn spec(value: Value) -> WebSpec {
        serde_json::from_value(value).expect("spec")
    }

    #[test]
    fn legacy_spec_synthesizes_init_and_scaffold() {
        let spec = spec(json!({"version": 1, "target": "next", "project": {"name": "demo"}}));
        let built = build_steps(&spec, &next_manifest());
        assert!(built.diagnostics.is_empty(), "{:?}", built.diagnostics);
        let ids: Vec<_> = built.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["init", "scaffold_web"]);
        assert_eq!(built.steps[1].requires, vec!["init"]);
        assert!(built.steps[1].checks.contains(&Check::FileExists {
            path: "app/package.json".to_string()
        }));
        assert_eq!(
            built.steps[1].ops,
            vec![Op::Run {
                cmd: "npx create-next-app app --name demo".to_string()
            }]
        );
    }

    #[test]
    fn missing_scaffold_macro_is_e102_and_step_is_omitted() {
        let mut m = next_manifest();
        m.macros.remove(SCAFFOLD_MACRO);
        let spec = spec(json!({"version": 1, "target": "next", "project": {"name": "demo"}}));
        let built = build_steps(&spec, &m);
        assert_eq!(built.steps.len(), 1);
        assert_eq!(built.diagnostics[0].code, Code::MissingMacro);
    }

    #[test]
    fn file_based_routes_expand_per_route() {
        let spec = spec(json!({
            "version": 1, "target": "next", "project": {"name": "demo"},
            "workspace": {"dir": "web"},
            "routes": ["/", "/about"]
        }));
        let built = build_steps(&spec, &next_manifest());
        let routes = built.steps.iter().find(|s| s.id == "routes").expect("routes step");
        assert_eq!(
            routes.ops.iter().filter_map(Op::write_target).collect::<Vec<_>>(),
            vec!["web/src/app/page.tsx", "web/src/app/about/page.tsx"]
        );
        assert_eq!(routes.checks.len(), 2);
        assert_eq!(
            routes.checks[1],
            Check::RouteExists {
                dir: "web".to_string(),
                route: "/about".to_string()
            }
        );
    }

    #[test]
    fn router_table_routes_expand_once_with_all_routes() {
        let mut m = next_manifest();
        m.macros.insert(
            "routing.table".to_string(),
            serde_json::from_value(json!({
                "args": {"dir": "path", "routes": "json", "file": "path"},
                "expandsTo": [{"writeFile": {
                    "path": "${file}",
                    "content": "export const routes = ${routes};\n"
                }}]
            }))
            .expect("macro"),
        );
        m.semantics.routing = Some(Routing::RouterTable {
            routes_file: "src/routes.ts".to_string(),
        });
        let spec = spec(json!({
            "version": 1, "target": "next", "project": {"name": "demo"},
            "routes": ["/", "/about"]
        }));

        let built = build_steps(&spec, &m);
        assert!(built.diagnostics.is_empty(), "{:?}", built.diagnostics);
        let routes = built.steps.iter().find(|s| s.id == "routes").expect("routes step");
        assert_eq!(routes.requires, vec!["scaffold_web"]);
        assert_eq!(
            routes.ops,
            vec![Op::WriteFile {
                path: "app/src/routes.ts".to_string(),
                content: "export const routes = [\"/\",\"/about\"];\n".to_string()
            }]
        );
        let checked: Vec<_> = routes
            .checks
            .iter()
            .map(|c| match c {
                Check::RouteExists { dir, route } => (dir.as_str(), route.as_str()),
                other => panic!("unexpected check {other:?}"),
            })
            .collect();
        assert_eq!(checked, vec![("app", "/"), ("app", "/about")]);
    }

    #[test]
    fn router_table_without_table_macro_is_e102() {
        let mut m = next_manifest();
        m.semantics.routing = Some(Routing::RouterTable {
            routes_file: "src/routes.ts".to_string(),
        });
        let spec = spec(json!({
            "version": 1, "target": "next", "project": {"name": "demo"}, "routes": ["/"]
        }));
        let built = build_steps(&spec, &m);
        assert!(built.steps.iter().all(|s| s.id != "routes"));
        assert_eq!(built.diagnostics[0].code, Code::MissingMacro);
        assert_eq!(built.diagnostics[0].path.as_deref(), Some("macros.routing.table"));
    }

    #[test]
    fn ui_section_adds_setup_step_after_scaffold() {
        let mut m = next_manifest();
        m.macros.insert(
            "ui.setup".to_string(),
            serde_json::from_value(json!({
                "args": {"dir": "path", "library": "string", "components": "string[]"},
                "expandsTo": [{"run": "npx ${library}@latest add ${components...} --cwd ${dir}"}]
            }))
            .expect("macro"),
        );
        let spec = spec(json!({
            "version": 1, "target": "next", "project": {"name": "demo"},
            "ui": {"library": "shadcn", "components": ["button", "card"]}
        }));

        let built = build_steps(&spec, &m);
        assert!(built.diagnostics.is_empty(), "{:?}", built.diagnostics);
        let ids: Vec<_> = built.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["init", "scaffold_web", "setup_ui"]);
        let ui = &built.steps[2];
        assert_eq!(ui.requires, vec!["scaffold_web"]);
        assert_eq!(
            ui.ops,
            vec![Op::Run {
                cmd: "npx shadcn@latest add button card --cwd app".to_string()
            }]
        );
        assert_eq!(
            ui.checks,
            vec![Check::FileContains {
                path: "app/package.json".to_string(),
                text: "shadcn".to_string()
            }]
        );
    }

    #[test]
    fn ui_section_without_setup_macro_is_skipped() {
        let spec = spec(json!({
            "version": 1, "target": "next", "project": {"name": "demo"},
            "ui": {"library": "shadcn"}
        }));
        let built = build_steps(&spec, &next_manifest());
        assert!(built.diagnostics.is_empty());
        assert!(built.steps.iter().all(|s| s.id != "setup_ui"));
    }

    #[test]
    fn routes_without_routing_semantics_are_e102() {
        let mut m = next_manifest();
        m.semantics.routing = None;
        let spec = spec(json!({
            "version": 1, "target": "next", "project": {"name": "demo"}, "routes": ["/"]
        }));
        let built = build_steps(&spec, &m);
        assert!(built.steps.iter().all(|s| s.id != "routes"));
        assert_eq!(built.diagnostics[0].code, Code::MissingMacro);
    }

    #[test]
    fn quality_gates_become_runs_and_cmd_checks() {
        let spec = spec(json!({
            "version": 1, "target": "next", "project": {"name": "demo"},
            "quality": {"gates": ["npm run lint", "npm test"]}
        }));
        let built = build_steps(&spec, &next_manifest());
        let gates = built.steps.last().expect("gates");
        assert_eq!(gates.id, "quality_gates");
        assert_eq!(gates.ops.len(), 2);
        assert_eq!(
            gates.checks[1],
            Check::CmdOk {
                cmd: "npm test".to_string()
            }
        );
    }

    #[test]
    fn explicit_steps_translate_actions_and_ensures() {
        let spec = spec(json!({
            "version": 2, "target": "next", "project": {"name": "demo"},
            "workspace": {"dir": "web"},
            "steps": [{
                "id": "s1",
                "actions": [
                    {"run": "npm ci"},
                    {"writeFile": {"path": "web/README.md", "template": "readme.tpl", "vars": {"a": "b"}}},
                    {"appendFile": {"path": ".gitignore", "content": "dist/\n"}}
                ],
                "ensures": [
                    {"routeExists": "/"},
                    {"docContainsFuzzy": {"path": "web/README.md", "text": "hello"}}
                ],
                "claims": ["I1"]
            }]
        }));
        let built = build_steps(&spec, &next_manifest());
        assert!(built.diagnostics.is_empty(), "{:?}", built.diagnostics);
        let step = &built.steps[0];
        let tags: Vec<_> = step.ops.iter().map(Op::tag).collect();
        assert_eq!(tags, vec!["RUN", "WRITE_TEMPLATE", "APPEND_FILE"]);
        assert_eq!(
            step.checks,
            vec![
                Check::RouteExists {
                    dir: "web".to_string(),
                    route: "/".to_string()
                },
                Check::DocContainsFuzzy {
                    path: "web/README.md".to_string(),
                    text: "hello".to_string(),
                    threshold: DEFAULT_FUZZY_THRESHOLD,
                    gate: true
                }
            ]
        );
        assert_eq!(step.claims, vec!["I1"]);
    }

    #[test]
    fn undecodable_actions_and_ensures_are_reported() {
        let spec = spec(json!({
            "version": 2, "target": "next", "project": {"name": "demo"},
            "steps": [{
                "id": "s1",
                "actions": [{"deploy": "prod"}, {"writeFile": {"path": "a.txt"}}],
                "ensures": [{"pingOk": "http://localhost"}]
            }]
        }));
        let built = build_steps(&spec, &next_manifest());
        let codes: Vec<_> = built.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![Code::UnknownAction, Code::WriteFileNoContent, Code::UnknownEnsure]
        );
        assert_eq!(built.diagnostics[0].path.as_deref(), Some("steps[0].actions[0]"));
        assert!(built.steps[0].ops.is_empty());
    }

    #[test]
    fn docs_and_artifacts_produce_trailing_verify_step() {
        let spec = spec(json!({
            "version": 2, "target": "next", "project": {"name": "demo"},
            "steps": [{"id": "s1", "actions": [{"run": "npm ci"}]}],
            "docs": {
                "requiredFiles": ["README.md"],
                "sections": [{"path": "README.md", "title": "Usage"}],
                "expect": [
                    {"path": "README.md", "text": "npm start"},
                    {"path": "README.md", "text": "run the dev server", "match": "fuzzy", "threshold": 0.6, "gate": false}
                ]
            },
            "artifacts": {"required": [{"path": "dist/index.html"}]}
        }));
        let built = build_steps(&spec, &next_manifest());
        let verify = built.steps.last().expect("verify");
        assert_eq!(verify.id, VERIFY_DOCS_STEP);
        assert_eq!(verify.requires, vec!["s1"]);
        assert!(!verify.has_ops());
        let kinds: Vec<_> = verify.checks.iter().map(Check::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "file.exists",
                "doc.section",
                "doc.contains",
                "doc.contains_fuzzy",
                "artifact.exists"
            ]
        );
        assert!(matches!(
            verify.checks[3],
            Check::DocContainsFuzzy { gate: false, threshold, .. } if threshold == 0.6
        ));
    }
}
