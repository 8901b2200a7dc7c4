//! modgraph test utilities.
//!
//! Helpers for integration testing: a descriptor builder that renders
//! `<Module>.Build.cs` text, and on-disk plugin trees in a temp directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Create a test manifest with the shared PCH policy and no dependencies.
pub fn test_manifest(name: &str) -> TestManifest {
    TestManifest {
        name: name.to_string(),
        pch_usage: Some("UseExplicitOrSharedPCHs".to_string()),
        public: Vec::new(),
        private: Vec::new(),
        editor_public: Vec::new(),
        editor_private: Vec::new(),
        extra: Vec::new(),
    }
}

/// A descriptor builder for creating test fixtures.
#[derive(Debug, Clone)]
pub struct TestManifest {
    pub name: String,
    pub pch_usage: Option<String>,
    pub public: Vec<String>,
    pub private: Vec<String>,
    pub editor_public: Vec<String>,
    pub editor_private: Vec<String>,
    /// Raw statements appended to the constructor body.
    pub extra: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl TestManifest {
    /// Set public dependencies.
    pub fn public(mut self, deps: &[&str]) -> Self {
        self.public = names(deps);
        self
    }

    /// Set private dependencies.
    pub fn private(mut self, deps: &[&str]) -> Self {
        self.private = names(deps);
        self
    }

    /// Public dependencies inside `if (Target.bBuildEditor)`.
    pub fn editor_public(mut self, deps: &[&str]) -> Self {
        self.editor_public = names(deps);
        self
    }

    /// Private dependencies inside `if (Target.bBuildEditor)`.
    pub fn editor_private(mut self, deps: &[&str]) -> Self {
        self.editor_private = names(deps);
        self
    }

    /// Set the PCH enumerant.
    pub fn pch(mut self, mode: &str) -> Self {
        self.pch_usage = Some(mode.to_string());
        self
    }

    /// Leave out the PCH assignment.
    pub fn without_pch(mut self) -> Self {
        self.pch_usage = None;
        self
    }

    /// Append a raw statement, e.g. `bEnforceIWYU = true;`.
    pub fn statement(mut self, raw: &str) -> Self {
        self.extra.push(raw.to_string());
        self
    }

    /// Render descriptor source text.
    pub fn render(&self) -> String {
        let mut out = String::from("using UnrealBuildTool;\n\n");
        out.push_str(&format!("public class {0} : ModuleRules\n{{\n", self.name));
        out.push_str(&format!(
            "    public {0}(ReadOnlyTargetRules Target) : base(Target)\n    {{\n",
            self.name
        ));
        if let Some(pch) = &self.pch_usage {
            out.push_str(&format!("        PCHUsage = PCHUsageMode.{pch};\n"));
        }
        push_list(&mut out, "        ", "PublicDependencyModuleNames", &self.public);
        push_list(&mut out, "        ", "PrivateDependencyModuleNames", &self.private);
        for raw in &self.extra {
            out.push_str(&format!("        {raw}\n"));
        }
        if !self.editor_public.is_empty() || !self.editor_private.is_empty() {
            out.push_str("\n        if (Target.bBuildEditor)\n        {\n");
            push_list(&mut out, "            ", "PublicDependencyModuleNames", &self.editor_public);
            push_list(&mut out, "            ", "PrivateDependencyModuleNames", &self.editor_private);
            out.push_str("        }\n");
        }
        out.push_str("    }\n}\n");
        out
    }
}

fn push_list(out: &mut String, indent: &str, field: &str, deps: &[String]) {
    if deps.is_empty() {
        return;
    }
    let quoted: Vec<String> = deps.iter().map(|d| format!("\"{d}\"")).collect();
    out.push_str(&format!(
        "\n{indent}{field}.AddRange(new string[] {{ {} }});\n",
        quoted.join(", ")
    ));
}

/// A plugins root in a temporary directory, removed on drop.
pub struct PluginTree {
    dir: TempDir,
}

impl PluginTree {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Directory `<root>/<plugin>/Source/<module>`.
    pub fn module_dir(&self, plugin: &str, module: &str) -> PathBuf {
        self.root().join(plugin).join("Source").join(module)
    }

    /// Write `manifest` under `plugin`, returning the descriptor path.
    pub fn add(&self, plugin: &str, manifest: &TestManifest) -> io::Result<PathBuf> {
        self.add_raw(plugin, &manifest.name, &manifest.render())
    }

    /// Write arbitrary descriptor text for `module` under `plugin`.
    pub fn add_raw(&self, plugin: &str, module: &str, content: &str) -> io::Result<PathBuf> {
        let dir = self.module_dir(plugin, module);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{module}.Build.cs"));
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Create a module directory without a descriptor.
    pub fn add_empty_module(&self, plugin: &str, module: &str) -> io::Result<PathBuf> {
        let dir = self.module_dir(plugin, module);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
