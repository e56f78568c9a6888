//! Target registry and template loader.
//!
//! A registry maps a target id to its raw stack manifest; shape validation is
//! the compiler's job. Directory layout for [`DirRegistry`]:
//!
//! ```text
//! <root>/<target>/manifest.json   (or manifest.yaml / manifest.yml)
//! <root>/<target>/templates/<relative path>
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::debug;

use crate::core::path::is_contained;
use crate::core::schema::parse_structured;

const MANIFEST_FILES: [&str; 3] = ["manifest.json", "manifest.yaml", "manifest.yml"];

/// Resolves target ids to raw manifest documents.
pub trait Registry {
    /// `Ok(None)` when the target is unknown; `Err` when it exists but cannot be loaded.
    fn lookup(&self, target: &str) -> Result<Option<Value>>;
}

/// Loads template sources referenced by `WRITE_TEMPLATE` ops.
pub trait TemplateLoader {
    fn load(&self, target: &str, relative_path: &str) -> Result<String>;
}

/// In-memory registry, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    manifests: BTreeMap<String, Value>,
    templates: BTreeMap<(String, String), String>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest(mut self, target: impl Into<String>, manifest: Value) -> Self {
        self.manifests.insert(target.into(), manifest);
        self
    }

    pub fn with_template(
        mut self,
        target: impl Into<String>,
        relative_path: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        self.templates
            .insert((target.into(), relative_path.into()), source.into());
        self
    }
}

impl Registry for MemoryRegistry {
    fn lookup(&self, target: &str) -> Result<Option<Value>> {
        Ok(self.manifests.get(target).cloned())
    }
}

impl TemplateLoader for MemoryRegistry {
    fn load(&self, target: &str, relative_path: &str) -> Result<String> {
        self.templates
            .get(&(target.to_string(), relative_path.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("template '{relative_path}' not found for target '{target}'"))
    }
}

/// Registry backed by one directory per target.
#[derive(Debug, Clone)]
pub struct DirRegistry {
    root: PathBuf,
}

impl DirRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn target_dir(&self, target: &str) -> Result<PathBuf> {
        if !is_contained(target) || target.contains('/') || target.contains('\\') {
            return Err(anyhow!("invalid target id '{target}'"));
        }
        Ok(self.root.join(target))
    }
}

impl Registry for DirRegistry {
    fn lookup(&self, target: &str) -> Result<Option<Value>> {
        let dir = self.target_dir(target)?;
        let Some(path) = MANIFEST_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
        else {
            debug!(target_id = %target, root = %self.root.display(), "no manifest for target");
            return Ok(None);
        };
        let text =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let value = parse_structured(&text).with_context(|| format!("parse {}", path.display()))?;
        debug!(target_id = %target, path = %path.display(), "loaded manifest");
        Ok(Some(value))
    }
}

impl TemplateLoader for DirRegistry {
    fn load(&self, target: &str, relative_path: &str) -> Result<String> {
        if !is_contained(relative_path) {
            return Err(anyhow!(
                "template path '{relative_path}' must be relative and stay inside the templates directory"
            ));
        }
        let path = self.target_dir(target)?.join("templates").join(relative_path);
        fs::read_to_string(&path).with_context(|| format!("read template {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dir_registry_reads_json_and_yaml_manifests() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("next")).expect("mkdir");
        fs::write(
            temp.path().join("next/manifest.json"),
            r#"{"presetVersion": "1"}"#,
        )
        .expect("write");
        fs::create_dir_all(temp.path().join("vite")).expect("mkdir");
        fs::write(temp.path().join("vite/manifest.yaml"), "presetVersion: '2'\n").expect("write");

        let registry = DirRegistry::new(temp.path());
        assert_eq!(
            registry.lookup("next").expect("lookup"),
            Some(json!({"presetVersion": "1"}))
        );
        assert_eq!(
            registry.lookup("vite").expect("lookup"),
            Some(json!({"presetVersion": "2"}))
        );
        assert_eq!(registry.lookup("astro").expect("lookup"), None);
    }

    #[test]
    fn unreadable_manifest_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("next")).expect("mkdir");
        fs::write(temp.path().join("next/manifest.json"), "{ nope").expect("write");
        assert!(DirRegistry::new(temp.path()).lookup("next").is_err());
    }

    #[test]
    fn template_paths_cannot_escape() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("next/templates")).expect("mkdir");
        fs::write(temp.path().join("next/templates/page.tsx"), "x").expect("write");
        let registry = DirRegistry::new(temp.path());
        assert_eq!(registry.load("next", "page.tsx").expect("load"), "x");
        assert!(registry.load("next", "../manifest.json").is_err());
        assert!(registry.lookup("../next").is_err());
    }

    #[test]
    fn memory_registry_serves_templates() {
        let registry = MemoryRegistry::new()
            .with_manifest("next", json!({}))
            .with_template("next", "a.tpl", "hello");
        assert!(registry.lookup("next").expect("lookup").is_some());
        assert_eq!(registry.load("next", "a.tpl").expect("load"), "hello");
        assert!(registry.load("next", "b.tpl").is_err());
    }
}
