//! Test-only helpers: a git sandbox, fixture manifests/specs and a scripted
//! command runner.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::io::process::{CommandOutcome, CommandRunner};
use crate::io::registry::MemoryRegistry;

/// Target id used by the fixtures.
pub const FIXTURE_TARGET: &str = "next";

/// Temporary git repository used as an execution workdir.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        let repo = Self { dir };
        repo.git(&["init", "-q"])?;
        repo.git(&["config", "user.email", "webspec@example.com"])?;
        repo.git(&["config", "user.name", "webspec tests"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, rel: &str) -> PathBuf {
        self.path().join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn read(&self, rel: &str) -> Result<String> {
        let path = self.join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    /// Stage `paths` (force-adding ignored files) and commit them.
    pub fn commit(&self, paths: &[&str]) -> Result<()> {
        let mut args = vec!["add", "-f", "--"];
        args.extend_from_slice(paths);
        self.git(&args)?;
        self.git(&["commit", "-q", "-m", "test commit"])
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }
}

/// Next.js-flavoured manifest with file-based routing.
pub fn fixture_manifest() -> Value {
    json!({
        "id": FIXTURE_TARGET,
        "presetVersion": "1",
        "effectsPolicy": {
            "allowWrite": ["app/**", "docs/**", ".webspec/**", ".gitignore", "README.md"],
            "denyWrite": ["**/.env", "**/.env.*"]
        },
        "commands": {
            "allowPrefixes": ["npm", "npx", "node"],
            "denySubstrings": ["rm -rf", "--force"]
        },
        "macros": {
            "stack.scaffold": {
                "description": "Create a Next.js app",
                "args": {"dir": "path", "name": "string"},
                "expandsTo": [
                    {"run": "npx create-next-app@latest ${dir} --ts --use-npm --yes"},
                    {"writeFile": {
                        "path": "${dir}/package.json",
                        "content": "{\"name\": \"${name}\"}\n"
                    }}
                ]
            },
            "ui.setup": {
                "args": {"dir": "path", "library": "string", "components": "string[]"},
                "expandsTo": [
                    {"run": "npx ${library}@latest add ${components...} --cwd ${dir}"}
                ]
            },
            "routing.page": {
                "args": {"dir": "path", "route": "string", "file": "path"},
                "expandsTo": [
                    {"writeTemplate": {
                        "path": "${file}",
                        "template": "page.tsx.tpl",
                        "vars": {"route": "${route}"}
                    }}
                ]
            }
        },
        "semantics": {
            "projectManifest": "package.json",
            "routing": {"style": "fileBased", "pagesDir": "src/app", "pageFile": "page.tsx"}
        }
    })
}

/// Registry holding [`fixture_manifest`] and its page template.
pub fn fixture_registry() -> MemoryRegistry {
    MemoryRegistry::new()
        .with_manifest(FIXTURE_TARGET, fixture_manifest())
        .with_template(
            FIXTURE_TARGET,
            "page.tsx.tpl",
            "export default function Page() {\n  return <main data-route=\"{{route}}\">{{route}}</main>;\n}\n",
        )
}

/// Minimal legacy spec: no steps, so the default program is synthesized.
pub fn legacy_spec() -> String {
    "version: 1\ntarget: next\nproject:\n  name: demo\n".to_string()
}

/// Current-shape spec that compiles cleanly against [`fixture_manifest`].
pub fn valid_spec() -> Value {
    json!({
        "version": 2,
        "target": FIXTURE_TARGET,
        "project": {"name": "demo", "description": "fixture"},
        "intent": {
            "summary": "Ship a documented landing page",
            "invariants": [
                {"id": "I-DOCS", "text": "README documents usage"},
                {"id": "I-BUILD", "text": "the app builds"}
            ],
            "nonGoals": ["auth"]
        },
        "effects": {"writeScopes": ["app/**", "README.md"], "expansion": "explicit"},
        "assumptions": [{"id": "D-NODE", "text": "node 20 is available", "status": "verified"}],
        "decisions": [
            {
                "id": "D-NODE",
                "question": "Which runtime?",
                "answer": "node 20",
                "rationale": "LTS",
                "status": "final",
                "confidence": 0.9
            },
            {
                "id": "D-DOCS",
                "question": "Where do docs live?",
                "answer": "README.md",
                "rationale": "single entry point",
                "status": "final",
                "confidence": 0.8,
                "parent": "D-NODE"
            }
        ],
        "steps": [
            {
                "id": "readme",
                "actions": [{"writeFile": {"path": "README.md", "content": "# Demo\n\n## Usage\n\nRun npm start.\n"}}],
                "ensures": [{"fileExists": "README.md"}],
                "claims": ["I-DOCS"],
                "decisions": ["D-DOCS"]
            },
            {
                "id": "build",
                "requires": ["readme"],
                "actions": [{"run": "npm run build"}],
                "ensures": [{"cmdOk": "npm run build"}],
                "claims": ["I-BUILD"],
                "decisions": ["D-NODE"]
            }
        ],
        "docs": {
            "sections": [{"path": "README.md", "title": "Usage"}],
            "expect": [{"path": "README.md", "text": "run npm start", "match": "fuzzy"}]
        }
    })
}

/// Command runner that records commands and replays scripted exit codes.
///
/// Once the script is exhausted every command succeeds.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    codes: RefCell<VecDeque<i32>>,
    seen: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn with_codes(codes: Vec<i32>) -> Self {
        Self {
            codes: RefCell::new(codes.into()),
            seen: RefCell::default(),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.seen.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &str, _workdir: &Path) -> Result<CommandOutcome> {
        self.seen.borrow_mut().push(cmd.to_string());
        let code = self.codes.borrow_mut().pop_front().unwrap_or(0);
        Ok(CommandOutcome {
            code: Some(code),
            timed_out: false,
        })
    }
}
