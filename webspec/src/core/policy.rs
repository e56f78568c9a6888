//! Effect and command policy shared by the guardrail validator and the runtime.
//!
//! Both sides derive their verdicts from these types so a plan that passed the
//! compiler is judged by exactly the same rules again before execution.

use std::collections::BTreeSet;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::core::manifest::StackManifest;
use crate::core::path::{is_contained, normalize};

/// Why a write destination was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteViolation {
    /// Absolute, or climbs out of the working directory.
    Escapes,
    /// Matches no allowed manifest glob.
    Outside,
    /// Matches a denied manifest glob.
    Denied { glob: String },
    /// Outside the spec's declared write scopes.
    OutOfScope,
}

/// Why a command was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandViolation {
    NotAllowed { token: String },
    DeniedSubstring { needle: String },
}

/// Compiled write globs: manifest allow/deny plus optional spec scopes.
#[derive(Debug, Clone)]
pub struct WritePolicy {
    allow: GlobSet,
    deny: GlobSet,
    deny_patterns: Vec<String>,
    scopes: Option<GlobSet>,
}

impl WritePolicy {
    pub fn from_manifest(manifest: &StackManifest) -> Result<Self, globset::Error> {
        Ok(Self {
            allow: compile_globset(&manifest.effects_policy.allow_write)?,
            deny: compile_globset(&manifest.effects_policy.deny_write)?,
            deny_patterns: manifest.effects_policy.deny_write.clone(),
            scopes: None,
        })
    }

    /// Additionally require writes to land inside `scopes`.
    pub fn with_scopes(mut self, scopes: &[String]) -> Result<Self, globset::Error> {
        self.scopes = Some(compile_globset(scopes)?);
        Ok(self)
    }

    /// Every rule `path` breaks; empty means the write is permitted.
    pub fn violations(&self, path: &str) -> Vec<WriteViolation> {
        if !is_contained(path) {
            return vec![WriteViolation::Escapes];
        }
        let path = normalize(path);
        let mut violations = Vec::new();
        if !self.allow.is_match(path) {
            violations.push(WriteViolation::Outside);
        }
        for idx in self.deny.matches(path) {
            violations.push(WriteViolation::Denied {
                glob: self.deny_patterns[idx].clone(),
            });
        }
        if let Some(scopes) = &self.scopes
            && !scopes.is_match(path)
        {
            violations.push(WriteViolation::OutOfScope);
        }
        violations
    }
}

/// Command allow-list (leading token) and deny-list (substrings).
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    allow_prefixes: BTreeSet<String>,
    deny_substrings: Vec<String>,
}

impl CommandPolicy {
    pub fn from_manifest(manifest: &StackManifest) -> Self {
        Self {
            allow_prefixes: manifest.commands.allow_prefixes.iter().cloned().collect(),
            deny_substrings: manifest.commands.deny_substrings.clone(),
        }
    }

    pub fn violations(&self, cmd: &str) -> Vec<CommandViolation> {
        let mut violations = Vec::new();
        let token = leading_token(cmd);
        if !self.allow_prefixes.contains(token) {
            violations.push(CommandViolation::NotAllowed {
                token: token.to_string(),
            });
        }
        for needle in &self.deny_substrings {
            if cmd.contains(needle.as_str()) {
                violations.push(CommandViolation::DeniedSubstring {
                    needle: needle.clone(),
                });
            }
        }
        violations
    }

    pub fn allowed_prefixes(&self) -> impl Iterator<Item = &str> {
        self.allow_prefixes.iter().map(String::as_str)
    }
}

/// First whitespace-delimited token of a command (empty for blank commands).
pub fn leading_token(cmd: &str) -> &str {
    cmd.split_whitespace().next().unwrap_or("")
}

/// Compile globs where `*` stays within one path segment and `**` crosses segments.
pub fn compile_globset(globs: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        builder.add(GlobBuilder::new(glob).literal_separator(true).build()?);
    }
    builder.build()
}
