//! Shell command execution for `RUN` ops and `cmd.ok` checks.
//!
//! Commands run with inherited stdio so build tools stream their own output.
//! An optional timeout kills the child and counts as failure.

use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::config::RuntimeConfig;

/// Result of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    pub code: Option<i32>,
    pub timed_out: bool,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.code == Some(0)
    }

    fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            timed_out: false,
        }
    }
}

/// Seam between the executor and the host shell.
pub trait CommandRunner {
    fn run(&self, cmd: &str, workdir: &Path) -> Result<CommandOutcome>;
}

/// Runs commands through a configured shell (default `sh -c`).
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: Vec<String>,
    timeout: Option<Duration>,
}

impl ShellRunner {
    pub fn new(shell: Vec<String>, timeout: Option<Duration>) -> Result<Self> {
        if shell.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(anyhow!("shell must name a program"));
        }
        Ok(Self { shell, timeout })
    }

    pub fn from_config(cfg: &RuntimeConfig) -> Result<Self> {
        let timeout =
            (cfg.command_timeout_secs > 0).then(|| Duration::from_secs(cfg.command_timeout_secs));
        Self::new(cfg.shell.clone(), timeout)
    }

    fn command(&self, cmd: &str, workdir: &Path) -> Command {
        let mut command = Command::new(&self.shell[0]);
        command
            .args(&self.shell[1..])
            .arg(cmd)
            .current_dir(workdir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        command
    }
}

impl CommandRunner for ShellRunner {
    #[instrument(skip_all, fields(cmd = %cmd))]
    fn run(&self, cmd: &str, workdir: &Path) -> Result<CommandOutcome> {
        debug!("spawning child process");
        let mut child = match self.command(cmd, workdir).spawn() {
            Ok(child) => child,
            Err(err) => {
                error!(err = %err, "failed to spawn command");
                return Err(err).with_context(|| format!("spawn `{cmd}`"));
            }
        };

        let Some(timeout) = self.timeout else {
            let status = child.wait().context("wait for command")?;
            debug!(exit_code = ?status.code(), "command finished");
            return Ok(CommandOutcome::from_status(status));
        };

        match child.wait_timeout(timeout).context("wait for command")? {
            Some(status) => {
                debug!(exit_code = ?status.code(), "command finished");
                Ok(CommandOutcome::from_status(status))
            }
            None => {
                warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
                child.kill().context("kill command")?;
                let status = child.wait().context("wait command after kill")?;
                Ok(CommandOutcome {
                    code: status.code(),
                    timed_out: true,
                })
            }
        }
    }
}
