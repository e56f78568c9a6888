//! Guarded plan execution for `webspec run`.
//!
//! The executor trusts nothing it did not derive itself: before any op is
//! applied it re-resolves the manifest and re-checks every write target and
//! command against it. Steps then run strictly in order; the first failing op
//! or check aborts the run. Nothing is rolled back.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::compile::resolve_manifest;
use crate::core::docs::has_section;
use crate::core::manifest::{Routing, StackManifest};
use crate::core::path::{is_contained, join_rel};
use crate::core::plan::{Check, Op, PLAN_LANG, Plan, PlanStep};
use crate::core::policy::{
    CommandPolicy, CommandViolation, WritePolicy, WriteViolation, compile_globset,
};
use crate::core::similarity::best_score;
use crate::io::git::Git;
use crate::io::process::CommandRunner;
use crate::io::registry::{Registry, TemplateLoader};
use crate::io::template::render;

#[derive(Debug, Error)]
pub enum ExecError {
    /// The plan does not match its target or breaks policy; nothing was applied.
    #[error("plan rejected: {0}")]
    Rejected(String),
    #[error("step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Summary of a completed run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExecOutcome {
    pub steps_run: usize,
    /// Non-gating check shortfalls, in the order they were seen.
    pub warnings: Vec<String>,
}

/// Collaborators the executor drives.
pub struct ExecContext<'a> {
    pub registry: &'a dyn Registry,
    pub templates: &'a dyn TemplateLoader,
    pub runner: &'a dyn CommandRunner,
    pub workdir: &'a Path,
}

enum CheckOutcome {
    Pass,
    Warn(String),
    Fail(String),
}

/// Re-validate and apply `plan` inside `ctx.workdir`, writing `==> step <id>`
/// markers and warnings to `out`.
#[instrument(skip_all, fields(target_id = %plan.target, steps = plan.steps.len()))]
pub fn execute_plan(
    plan: &Plan,
    ctx: &ExecContext<'_>,
    out: &mut dyn Write,
) -> Result<ExecOutcome, ExecError> {
    let manifest = preflight(plan, ctx.registry)?;
    let mut outcome = ExecOutcome::default();

    for step in &plan.steps {
        writeln!(out, "==> step {}", step.id).context("write progress")?;
        info!(step = %step.id, ops = step.ops.len(), checks = step.checks.len(), "running step");
        run_step(plan, step, &manifest, ctx, out, &mut outcome)?;
        outcome.steps_run += 1;
    }
    Ok(outcome)
}

/// Lang, target, preset version and full policy check, before any effect.
fn preflight(plan: &Plan, registry: &dyn Registry) -> Result<StackManifest, ExecError> {
    if plan.lang != PLAN_LANG {
        return Err(ExecError::Rejected(format!(
            "unsupported plan language '{}' (expected '{PLAN_LANG}')",
            plan.lang
        )));
    }
    let manifest =
        resolve_manifest(registry, &plan.target).map_err(|d| ExecError::Rejected(d.to_string()))?;
    if manifest.preset_version != plan.preset_version {
        return Err(ExecError::Rejected(format!(
            "plan was compiled for preset {} of '{}', registry has {}",
            plan.preset_version, plan.target, manifest.preset_version
        )));
    }

    let writes = WritePolicy::from_manifest(&manifest)
        .map_err(|err| ExecError::Rejected(format!("invalid manifest write glob: {err}")))?;
    let commands = CommandPolicy::from_manifest(&manifest);
    let mut problems = Vec::new();
    for step in &plan.steps {
        for op in &step.ops {
            if let Some(target) = op.write_target() {
                problems.extend(
                    writes
                        .violations(target)
                        .into_iter()
                        .map(|v| format!("step '{}': {}", step.id, describe_write(target, &v))),
                );
            }
        }
        let cmds = step
            .ops
            .iter()
            .filter_map(Op::command)
            .chain(step.checks.iter().filter_map(Check::command));
        for cmd in cmds {
            problems.extend(
                commands
                    .violations(cmd)
                    .into_iter()
                    .map(|v| format!("step '{}': {}", step.id, describe_command(cmd, &v))),
            );
        }
    }
    if !problems.is_empty() {
        warn!(count = problems.len(), "preflight rejected plan");
        return Err(ExecError::Rejected(problems.join("; ")));
    }
    debug!("preflight passed");
    Ok(manifest)
}

fn describe_write(target: &str, violation: &WriteViolation) -> String {
    match violation {
        WriteViolation::Escapes => format!("write '{target}' escapes the working directory"),
        WriteViolation::Outside => format!("write '{target}' matches no allowed glob"),
        WriteViolation::Denied { glob } => format!("write '{target}' matches denied glob '{glob}'"),
        WriteViolation::OutOfScope => format!("write '{target}' is outside the write scopes"),
    }
}

fn describe_command(cmd: &str, violation: &CommandViolation) -> String {
    match violation {
        CommandViolation::NotAllowed { token } => {
            format!("command '{cmd}': '{token}' is not an allowed prefix")
        }
        CommandViolation::DeniedSubstring { needle } => {
            format!("command '{cmd}' contains denied '{needle}'")
        }
    }
}

fn run_step(
    plan: &Plan,
    step: &PlanStep,
    manifest: &StackManifest,
    ctx: &ExecContext<'_>,
    out: &mut dyn Write,
    outcome: &mut ExecOutcome,
) -> Result<(), ExecError> {
    let fail = |reason: String| ExecError::StepFailed {
        step: step.id.clone(),
        reason,
    };

    for op in &step.ops {
        apply_op(plan, op, ctx).map_err(|err| fail(format!("{} failed: {err:#}", op.tag())))?;
    }
    for check in &step.checks {
        let result = evaluate_check(check, manifest, ctx)
            .map_err(|err| fail(format!("check {} errored: {err:#}", check.kind())))?;
        match result {
            CheckOutcome::Pass => debug!(kind = check.kind(), "check passed"),
            CheckOutcome::Warn(message) => {
                let message = format!("step '{}': {message}", step.id);
                warn!(%message, "non-gating check below threshold");
                writeln!(out, "warning: {message}").context("write progress")?;
                outcome.warnings.push(message);
            }
            CheckOutcome::Fail(reason) => {
                return Err(fail(format!("check {} failed: {reason}", check.kind())));
            }
        }
    }
    Ok(())
}

fn apply_op(plan: &Plan, op: &Op, ctx: &ExecContext<'_>) -> anyhow::Result<()> {
    match op {
        Op::Run { cmd } => {
            let result = ctx.runner.run(cmd, ctx.workdir)?;
            if result.timed_out {
                return Err(anyhow!("`{cmd}` timed out"));
            }
            if !result.success() {
                return Err(anyhow!("`{cmd}` exited with {:?}", result.code));
            }
            Ok(())
        }
        Op::WriteFile { path, content } => write_file(ctx.workdir, path, content),
        Op::AppendFile { path, content } => {
            let dest = prepare_dest(ctx.workdir, path)?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&dest)
                .with_context(|| format!("open {}", dest.display()))?;
            file.write_all(content.as_bytes())
                .with_context(|| format!("append {}", dest.display()))
        }
        Op::WriteTemplate {
            path,
            template,
            vars,
        } => {
            let source = ctx.templates.load(&plan.target, template)?;
            write_file(ctx.workdir, path, &render(&source, vars))
        }
    }
}

fn write_file(workdir: &Path, path: &str, content: &str) -> anyhow::Result<()> {
    let dest = prepare_dest(workdir, path)?;
    fs::write(&dest, content).with_context(|| format!("write {}", dest.display()))
}

fn prepare_dest(workdir: &Path, path: &str) -> anyhow::Result<PathBuf> {
    if !is_contained(path) {
        return Err(anyhow!("refusing to write outside the working directory: {path}"));
    }
    let dest = workdir.join(path);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    }
    Ok(dest)
}

fn read_relative(workdir: &Path, path: &str) -> anyhow::Result<Option<String>> {
    if !is_contained(path) {
        return Err(anyhow!("check path escapes the working directory: {path}"));
    }
    let full = workdir.join(path);
    if !full.is_file() {
        return Ok(None);
    }
    fs::read_to_string(&full)
        .map(Some)
        .with_context(|| format!("read {}", full.display()))
}

fn exists(workdir: &Path, path: &str) -> anyhow::Result<bool> {
    if !is_contained(path) {
        return Err(anyhow!("check path escapes the working directory: {path}"));
    }
    Ok(workdir.join(path).exists())
}

fn evaluate_check(
    check: &Check,
    manifest: &StackManifest,
    ctx: &ExecContext<'_>,
) -> anyhow::Result<CheckOutcome> {
    let workdir = ctx.workdir;
    let verdict = |ok: bool, reason: String| {
        if ok {
            CheckOutcome::Pass
        } else {
            CheckOutcome::Fail(reason)
        }
    };

    Ok(match check {
        Check::FileExists { path } | Check::ArtifactExists { path } => {
            verdict(exists(workdir, path)?, format!("'{path}' does not exist"))
        }
        Check::FileContains { path, text } | Check::DocContains { path, text } => {
            match read_relative(workdir, path)? {
                None => CheckOutcome::Fail(format!("'{path}' does not exist")),
                Some(body) => verdict(body.contains(text.as_str()), format!("'{path}' does not contain {text:?}")),
            }
        }
        Check::CmdOk { cmd } => {
            let result = ctx.runner.run(cmd, workdir)?;
            verdict(result.success(), format!("`{cmd}` exited with {:?}", result.code))
        }
        Check::RouteExists { dir, route } => route_exists(workdir, manifest, dir, route)?,
        Check::DocSection { path, title } => match read_relative(workdir, path)? {
            None => CheckOutcome::Fail(format!("'{path}' does not exist")),
            Some(body) => verdict(
                has_section(&body, title),
                format!("'{path}' has no section titled {title:?}"),
            ),
        },
        Check::DocContainsFuzzy {
            path,
            text,
            threshold,
            gate,
        } => match read_relative(workdir, path)? {
            None => CheckOutcome::Fail(format!("'{path}' does not exist")),
            Some(body) => {
                let score = best_score(&body, text);
                debug!(path = %path, score, threshold, "fuzzy score");
                if score >= *threshold {
                    CheckOutcome::Pass
                } else {
                    let message = format!(
                        "'{path}' best match for {text:?} scored {score:.2} (< {threshold:.2})"
                    );
                    if *gate {
                        CheckOutcome::Fail(message)
                    } else {
                        CheckOutcome::Warn(message)
                    }
                }
            }
        },
        Check::GitTrackedOnly { dir, glob, allow } => tracked_only(workdir, dir, glob, allow)?,
    })
}

fn route_exists(
    workdir: &Path,
    manifest: &StackManifest,
    dir: &str,
    route: &str,
) -> anyhow::Result<CheckOutcome> {
    match &manifest.semantics.routing {
        None => Ok(CheckOutcome::Fail(
            "target declares no routing semantics".to_string(),
        )),
        Some(Routing::FileBased {
            pages_dir,
            page_file,
        }) => {
            let page = Routing::page_path(pages_dir, page_file, dir, route);
            Ok(if exists(workdir, &page)? {
                CheckOutcome::Pass
            } else {
                CheckOutcome::Fail(format!("page '{page}' for route '{route}' does not exist"))
            })
        }
        Some(Routing::RouterTable { routes_file }) => {
            let table = join_rel(&[dir, routes_file]);
            let Some(body) = read_relative(workdir, &table)? else {
                return Ok(CheckOutcome::Fail(format!("routes file '{table}' does not exist")));
            };
            let quoted = [format!("\"{route}\""), format!("'{route}'"), format!("`{route}`")];
            Ok(if quoted.iter().any(|q| body.contains(q.as_str())) {
                CheckOutcome::Pass
            } else {
                CheckOutcome::Fail(format!("routes file '{table}' does not declare '{route}'"))
            })
        }
    }
}

/// Tracked files under `dir` matching `glob` (both relative to `dir`) must be
/// exactly the `allow` list.
fn tracked_only(
    workdir: &Path,
    dir: &str,
    glob: &str,
    allow: &[String],
) -> anyhow::Result<CheckOutcome> {
    let git = Git::new(workdir);
    if !git.is_work_tree()? {
        return Ok(CheckOutcome::Fail(format!(
            "{} is not inside a git work tree",
            workdir.display()
        )));
    }
    let matcher = compile_globset(&[glob.to_string()])
        .with_context(|| format!("invalid glob '{glob}'"))?;
    let prefix = match dir.trim_start_matches("./").trim_end_matches('/') {
        "" | "." => String::new(),
        other => format!("{other}/"),
    };
    let mut matched: Vec<String> = git
        .tracked_files(dir)?
        .into_iter()
        .filter_map(|file| file.strip_prefix(prefix.as_str()).map(str::to_string))
        .filter(|rel| matcher.is_match(rel))
        .collect();
    matched.sort();
    let mut expected = allow.to_vec();
    expected.sort();
    Ok(if matched == expected {
        CheckOutcome::Pass
    } else {
        CheckOutcome::Fail(format!(
            "tracked files matching '{glob}' under '{dir}' are [{}], expected [{}]",
            matched.join(", "),
            expected.join(", ")
        ))
    })
}
