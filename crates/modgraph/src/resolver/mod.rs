//! Dependency resolution.
//!
//! For one build configuration the resolver:
//! - applies each manifest's conditional blocks to get its effective sets
//! - resolves every name against the set first and the host registry second
//! - reports overlaps, self-dependencies and unresolved names per edge
//! - finds public-edge cycles and computes transitive public closures
//!
//! Resolution is synchronous and performs no I/O.

mod closure;
pub mod order;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::loader::ManifestSet;
use crate::manifest::{BuildConfig, Condition, EffectiveDependency, Visibility};
use crate::registry::ModuleLookup;

use closure::PublicGraph;

pub use order::build_order;

/// What a dependency name resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Another manifest in the set.
    Manifest,
    /// A host registry module.
    Host,
    /// Neither.
    Unresolved,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Manifest => "manifest",
            Target::Host => "host",
            Target::Unresolved => "unresolved",
        }
    }
}

/// One effective dependency of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub name: String,
    pub visibility: Visibility,
    pub target: Target,
    /// Block that contributed the name; `None` for the base block.
    pub condition: Option<Condition>,
    pub line: usize,
}

/// Resolution result for one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedManifest {
    pub name: String,
    pub public: Vec<ResolvedDependency>,
    pub private: Vec<ResolvedDependency>,
    /// Everything reachable over public edges; `None` when the manifest
    /// is part of a public cycle.
    pub public_closure: Option<BTreeSet<String>>,
}

impl ResolvedManifest {
    /// Public then private dependencies.
    pub fn dependencies(&self) -> impl Iterator<Item = &ResolvedDependency> {
        self.public.iter().chain(&self.private)
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies().any(|d| d.name == name)
    }
}

/// A manifest set resolved under one build configuration.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: BuildConfig,
    /// Keyed by manifest identifier.
    pub modules: BTreeMap<String, ResolvedManifest>,
    /// Members of each public cycle, sorted.
    pub cycles: Vec<Vec<String>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn get(&self, name: &str) -> Option<&ResolvedManifest> {
        self.modules.get(name)
    }

    pub fn public_closure(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.modules.get(name)?.public_closure.as_ref()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

struct Resolver<'a> {
    set: &'a ManifestSet,
    registry: &'a dyn ModuleLookup,
    config: &'a BuildConfig,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Resolver<'a> {
    fn target(&self, name: &str) -> Target {
        if self.set.contains(name) {
            Target::Manifest
        } else if self.registry.contains(name) {
            Target::Host
        } else {
            Target::Unresolved
        }
    }

    fn diagnostic(&mut self, kind: DiagnosticKind, module: &str, line: usize, message: String) {
        let mut diagnostic = Diagnostic::new(kind, message).for_module(module);
        if let Some(path) = self.set.path_of(module) {
            diagnostic = diagnostic.at(path, line);
        }
        self.diagnostics.push(diagnostic);
    }

    fn resolve_list(
        &mut self,
        module: &str,
        list: Vec<EffectiveDependency>,
        visibility: Visibility,
    ) -> Vec<ResolvedDependency> {
        let mut resolved = Vec::with_capacity(list.len());
        for dep in list {
            if dep.name == module {
                self.diagnostic(
                    DiagnosticKind::SelfDependency,
                    module,
                    dep.line,
                    format!("module '{module}' lists itself as a {visibility} dependency"),
                );
            }
            let target = self.target(&dep.name);
            if target == Target::Unresolved {
                self.diagnostic(
                    DiagnosticKind::UnresolvedReference,
                    module,
                    dep.line,
                    format!(
                        "{visibility} dependency '{}' of '{module}' is neither a plugin module nor a known host module",
                        dep.name
                    ),
                );
            }
            resolved.push(ResolvedDependency {
                name: dep.name,
                visibility,
                target,
                condition: dep.condition,
                line: dep.line,
            });
        }
        resolved
    }

    fn resolve_manifest(&mut self, name: &str) -> Option<ResolvedManifest> {
        let manifest = self.set.manifest(name)?;
        let effective = manifest.effective(self.config);

        for public in &effective.public {
            let Some(private) = effective.private.iter().find(|d| d.name == public.name) else {
                continue;
            };
            // Base-block overlaps hold in every configuration and read the same.
            let scope = if public.condition.is_none() && private.condition.is_none() {
                String::new()
            } else {
                format!(" in {} builds", self.config.label())
            };
            self.diagnostic(
                DiagnosticKind::PublicPrivateOverlap,
                name,
                public.line,
                format!(
                    "'{}' is both a public and a private dependency of '{name}'{scope}; keep only one",
                    public.name
                ),
            );
        }

        let public = self.resolve_list(name, effective.public, Visibility::Public);
        let private = self.resolve_list(name, effective.private, Visibility::Private);
        Some(ResolvedManifest {
            name: name.to_string(),
            public,
            private,
            public_closure: None,
        })
    }
}

/// Resolve every manifest in `set` under `config`.
pub fn resolve(set: &ManifestSet, registry: &dyn ModuleLookup, config: &BuildConfig) -> Resolution {
    let mut resolver = Resolver {
        set,
        registry,
        config,
        diagnostics: Vec::new(),
    };

    let mut modules: BTreeMap<String, ResolvedManifest> = BTreeMap::new();
    for name in set.names() {
        if let Some(resolved) = resolver.resolve_manifest(name) {
            modules.insert(name.to_string(), resolved);
        }
    }

    let mut graph = PublicGraph::new();
    for module in modules.values() {
        graph.add_node(&module.name);
        for dep in &module.public {
            graph.add_edge(&module.name, &dep.name);
        }
    }

    let cycles = graph.cycles();
    let in_cycle: BTreeSet<&str> = cycles.iter().flatten().map(String::as_str).collect();
    for members in &cycles {
        let first = members.first().map(String::as_str).unwrap_or_default();
        let line = set.manifest(first).map(|m| m.line).unwrap_or_default();
        resolver.diagnostic(
            DiagnosticKind::PublicCycle,
            first,
            line,
            format!(
                "public dependency cycle between {}; break it by making one edge private",
                members.join(", ")
            ),
        );
    }

    let closures: BTreeMap<String, BTreeSet<String>> = modules
        .keys()
        .filter(|name| !in_cycle.contains(name.as_str()))
        .map(|name| (name.clone(), graph.closure(name)))
        .collect();
    for (name, closure) in closures {
        if let Some(module) = modules.get_mut(&name) {
            module.public_closure = Some(closure);
        }
    }

    debug!(
        config = %config,
        modules = modules.len(),
        cycles = cycles.len(),
        diagnostics = resolver.diagnostics.len(),
        "resolved manifest set"
    );

    Resolution {
        config: config.clone(),
        modules,
        cycles,
        diagnostics: resolver.diagnostics,
    }
}
