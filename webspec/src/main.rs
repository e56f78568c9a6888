//! WebSpec compiler and guarded executor.
//!
//! `webspec compile` turns a spec into a Plan IR (or diagnostics),
//! `webspec run` re-validates and applies a persisted plan, and
//! `webspec decisions` prints a spec's decision tree.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use webspec::compile::{CompileResult, compile, spec_hash};
use webspec::core::decision_tree::DecisionTree;
use webspec::core::plan::to_canonical_json;
use webspec::core::schema::parse_spec;
use webspec::execute::{ExecContext, ExecError, execute_plan};
use webspec::exit_codes;
use webspec::io::config::{default_config_path, load_config};
use webspec::io::plan_store::{load_plan, write_plan};
use webspec::io::process::ShellRunner;
use webspec::io::registry::DirRegistry;
use webspec::logging;

#[derive(Parser)]
#[command(
    name = "webspec",
    version,
    about = "Compile WebSpecs into guarded execution plans and run them"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a spec (JSON or YAML) into a Plan IR.
    Compile {
        /// Spec file.
        spec: PathBuf,
        /// Directory holding one sub-directory per target.
        #[arg(long)]
        registry: PathBuf,
        /// Write the plan here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Report format.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Re-validate and execute a compiled plan.
    Run {
        /// Plan file produced by `webspec compile`.
        plan: PathBuf,
        /// Directory holding one sub-directory per target.
        #[arg(long)]
        registry: PathBuf,
        /// Working tree the plan is applied to.
        #[arg(long, default_value = ".")]
        workdir: PathBuf,
        /// Runtime config (defaults to `<workdir>/.webspec/config.toml`).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Refuse to run unless this spec hashes to the plan's `specHash`.
        #[arg(long)]
        spec: Option<PathBuf>,
    },
    /// Print a spec's decision roots and parent/children index as JSON.
    Decisions {
        /// Spec file.
        spec: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Compile {
            spec,
            registry,
            out,
            format,
        } => cmd_compile(&spec, &registry, out.as_deref(), format),
        Command::Run {
            plan,
            registry,
            workdir,
            config,
            spec,
        } => cmd_run(&plan, &registry, &workdir, config.as_deref(), spec.as_deref()),
        Command::Decisions { spec } => cmd_decisions(&spec),
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn cmd_compile(spec: &Path, registry: &Path, out: Option<&Path>, format: Format) -> Result<i32> {
    let text = read_text(spec)?;
    let result = compile(&text, &DirRegistry::new(registry));

    if let (Some(out), Some(plan)) = (out, &result.plan) {
        write_plan(out, plan)?;
    }

    match format {
        Format::Json => {
            let mut payload =
                serde_json::to_string_pretty(&result).context("serialize compile result")?;
            payload.push('\n');
            io::stdout()
                .write_all(payload.as_bytes())
                .context("write stdout")?;
        }
        Format::Text => report_text(&result, out)?,
    }

    Ok(if result.ok {
        exit_codes::OK
    } else {
        exit_codes::REJECTED
    })
}

/// Diagnostics go to stderr; the plan goes to stdout unless `--out` was given.
fn report_text(result: &CompileResult, out: Option<&Path>) -> Result<()> {
    for diagnostic in &result.diagnostics {
        eprintln!("{diagnostic}");
    }
    match (&result.plan, out) {
        (Some(plan), None) => {
            let payload = to_canonical_json(plan).context("serialize plan")?;
            io::stdout()
                .write_all(payload.as_bytes())
                .context("write stdout")?;
        }
        (Some(plan), Some(out)) => {
            eprintln!("wrote {} ({} steps)", out.display(), plan.steps.len());
        }
        (None, _) => {
            let errors = result.errors().count();
            eprintln!("compile rejected: {errors} error(s)");
        }
    }
    Ok(())
}

fn cmd_run(
    plan_path: &Path,
    registry: &Path,
    workdir: &Path,
    config: Option<&Path>,
    spec: Option<&Path>,
) -> Result<i32> {
    let plan = load_plan(plan_path)?;
    if let Some(spec) = spec {
        let actual = spec_hash(&read_text(spec)?);
        if actual != plan.spec_hash {
            eprintln!(
                "spec {} hashes to {actual}, plan was compiled from {}",
                spec.display(),
                plan.spec_hash
            );
            return Ok(exit_codes::REJECTED);
        }
    }

    let config_path = config.map_or_else(|| default_config_path(workdir), Path::to_path_buf);
    let cfg = load_config(&config_path)?;
    let runner = ShellRunner::from_config(&cfg)?;
    let registry = DirRegistry::new(registry);
    let ctx = ExecContext {
        registry: &registry,
        templates: &registry,
        runner: &runner,
        workdir,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match execute_plan(&plan, &ctx, &mut out) {
        Ok(outcome) => {
            writeln!(
                out,
                "plan complete: {} step(s), {} warning(s)",
                outcome.steps_run,
                outcome.warnings.len()
            )
            .context("write stdout")?;
            Ok(exit_codes::OK)
        }
        Err(err @ ExecError::Rejected(_)) => {
            eprintln!("{err}");
            Ok(exit_codes::REJECTED)
        }
        Err(err) => {
            eprintln!("{err:#}");
            Ok(exit_codes::FAILED)
        }
    }
}

fn cmd_decisions(spec: &Path) -> Result<i32> {
    let text = read_text(spec)?;
    let spec = match parse_spec(&text) {
        Ok(spec) => spec,
        Err(diagnostic) => {
            eprintln!("{diagnostic}");
            return Ok(exit_codes::INVALID);
        }
    };
    let tree = match DecisionTree::build(&spec.decisions) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("{err}");
            return Ok(exit_codes::REJECTED);
        }
    };
    let report = json!({"roots": tree.roots(), "index": tree.index()});
    let mut payload = serde_json::to_string_pretty(&report).context("serialize decisions")?;
    payload.push('\n');
    io::stdout()
        .write_all(payload.as_bytes())
        .context("write stdout")?;
    Ok(exit_codes::OK)
}
