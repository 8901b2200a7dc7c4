//! Manifest set discovery and loading.
//!
//! Descriptors live at `<root>/<Plugin>/Source/<Module>/<Module>.Build.cs`.
//! Directories are visited in sorted order so that "first" and "second"
//! are well defined when two descriptors declare the same identifier.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::LoadError;
use crate::manifest::{MANIFEST_SUFFIX, Manifest, ParseOutcome, parse_manifest_bytes};

/// A manifest together with where it was found.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub manifest: Manifest,
    /// Descriptor file.
    pub path: PathBuf,
    /// Name of the plugin directory containing the module.
    pub plugin: String,
}

/// All manifests discovered under one root, keyed by identifier.
///
/// Built once by the loader (or [`ManifestSetBuilder`]) and read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct ManifestSet {
    root: PathBuf,
    entries: BTreeMap<String, ManifestEntry>,
    diagnostics: Vec<Diagnostic>,
}

impl ManifestSet {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.get(name)
    }

    pub fn manifest(&self, name: &str) -> Option<&Manifest> {
        self.entries.get(name).map(|e| &e.manifest)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Descriptor path for an identifier, for error reporting.
    pub fn path_of(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(|e| e.path.as_path())
    }

    /// Entries in identifier order.
    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.values()
    }

    /// Manifests in identifier order.
    pub fn manifests(&self) -> impl Iterator<Item = &Manifest> {
        self.entries.values().map(|e| &e.manifest)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diagnostics produced while parsing and assembling the set.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Assembles a [`ManifestSet`], enforcing identifier uniqueness.
#[derive(Debug)]
pub struct ManifestSetBuilder {
    root: PathBuf,
    entries: BTreeMap<String, ManifestEntry>,
    diagnostics: Vec<Diagnostic>,
}

impl ManifestSetBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Add a manifest. If its identifier is taken, the manifest is rejected
    /// with a `DuplicateIdentifier` error and `false` is returned.
    pub fn insert(&mut self, plugin: impl Into<String>, path: impl Into<PathBuf>, manifest: Manifest) -> bool {
        let path = path.into();
        if let Some(existing) = self.entries.get(&manifest.name) {
            warn!(
                module = %manifest.name,
                first = %existing.path.display(),
                second = %path.display(),
                "duplicate module identifier, keeping the first"
            );
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::DuplicateIdentifier,
                    format!(
                        "module '{}' is already declared by {}; this declaration in {} is ignored",
                        manifest.name,
                        existing.path.display(),
                        path.display()
                    ),
                )
                .for_module(&manifest.name)
                .at(&path, manifest.line),
            );
            return false;
        }
        self.entries.insert(
            manifest.name.clone(),
            ManifestEntry {
                manifest,
                path,
                plugin: plugin.into(),
            },
        );
        true
    }

    /// Insert a parse result: its diagnostics are kept either way.
    pub fn insert_parsed(&mut self, plugin: impl Into<String>, outcome: ParseOutcome) -> bool {
        self.diagnostics.extend(outcome.diagnostics);
        match outcome.manifest {
            Some(manifest) => self.insert(plugin, outcome.path, manifest),
            None => false,
        }
    }

    pub fn diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn build(self) -> ManifestSet {
        ManifestSet {
            root: self.root,
            entries: self.entries,
            diagnostics: self.diagnostics,
        }
    }
}

/// A descriptor found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredManifest {
    pub plugin: String,
    /// `<root>/<Plugin>/Source/<Module>`
    pub module_dir: PathBuf,
    /// `<module_dir>/<Module>.Build.cs`
    pub path: PathBuf,
}

/// Result of [`discover`]: descriptors in load order plus notes about
/// module directories without one.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub manifests: Vec<DiscoveredManifest>,
    pub diagnostics: Vec<Diagnostic>,
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut dirs = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| LoadError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Walk `root` for descriptors. Nothing below `Source/<Module>` is visited.
pub fn discover(root: &Path) -> Result<Discovery, LoadError> {
    if !root.is_dir() {
        return Err(LoadError::MissingRoot {
            path: root.to_path_buf(),
        });
    }

    let mut discovery = Discovery::default();
    for plugin_dir in sorted_subdirs(root)? {
        let source_dir = plugin_dir.join("Source");
        if !source_dir.is_dir() {
            debug!(plugin_dir = %plugin_dir.display(), "no Source directory, skipping");
            continue;
        }
        let plugin = dir_name(&plugin_dir);
        for module_dir in sorted_subdirs(&source_dir)? {
            let module = dir_name(&module_dir);
            let path = module_dir.join(format!("{module}{MANIFEST_SUFFIX}"));
            if path.is_file() {
                discovery.manifests.push(DiscoveredManifest {
                    plugin: plugin.clone(),
                    module_dir,
                    path,
                });
            } else {
                discovery.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::MissingDescriptor,
                        format!("module directory '{module}' has no {module}{MANIFEST_SUFFIX}"),
                    )
                    .for_module(&module)
                    .in_file(&module_dir),
                );
            }
        }
    }
    Ok(discovery)
}

/// Options controlling [`load`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Maximum descriptors read and parsed at once.
    pub jobs: usize,
    /// Cancels the load between descriptors.
    pub cancel: CancellationToken,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            jobs: 8,
            cancel: CancellationToken::new(),
        }
    }
}

/// How a load finished.
#[derive(Debug)]
pub enum LoadOutcome {
    Complete(ManifestSet),
    /// The load was cancelled; partial results were discarded.
    Cancelled,
}

impl LoadOutcome {
    /// The set, if the load ran to completion.
    pub fn into_set(self) -> Option<ManifestSet> {
        match self {
            LoadOutcome::Complete(set) => Some(set),
            LoadOutcome::Cancelled => None,
        }
    }
}

/// Discover, read and parse every descriptor under `root`.
///
/// Descriptors are read and parsed concurrently but inserted into the set
/// in discovery order, so the result does not depend on scheduling.
pub async fn load(root: &Path, options: &LoadOptions) -> Result<LoadOutcome, LoadError> {
    if options.cancel.is_cancelled() {
        return Ok(LoadOutcome::Cancelled);
    }

    let discovery = discover(root)?;
    let total = discovery.manifests.len();
    debug!(root = %root.display(), count = total, "discovered build descriptors");

    let permits = Arc::new(Semaphore::new(options.jobs.max(1)));
    let mut tasks = JoinSet::new();
    for (index, found) in discovery.manifests.iter().cloned().enumerate() {
        let permits = Arc::clone(&permits);
        let cancel = options.cancel.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let bytes = tokio::fs::read(&found.path)
                .await
                .map_err(|e| LoadError::io(&found.path, e))?;
            let outcome = parse_manifest_bytes(&bytes, &found.module_dir);
            Ok::<_, LoadError>(Some((index, found.plugin, outcome)))
        });
    }

    let mut parsed: Vec<Option<(String, ParseOutcome)>> = vec![None; total];
    loop {
        let joined = tokio::select! {
            biased;
            () = options.cancel.cancelled() => {
                tasks.abort_all();
                info!(root = %root.display(), "manifest load cancelled");
                return Ok(LoadOutcome::Cancelled);
            }
            joined = tasks.join_next() => joined,
        };
        let Some(joined) = joined else {
            break;
        };
        let result = joined.map_err(|e| LoadError::Task {
            details: e.to_string(),
        })?;
        match result? {
            Some((index, plugin, outcome)) => parsed[index] = Some((plugin, outcome)),
            None => return Ok(LoadOutcome::Cancelled),
        }
    }

    let mut builder = ManifestSetBuilder::new(root);
    for diagnostic in discovery.diagnostics {
        builder.diagnostic(diagnostic);
    }
    for (plugin, outcome) in parsed.into_iter().flatten() {
        builder.insert_parsed(plugin, outcome);
    }
    let set = builder.build();
    info!(
        root = %root.display(),
        manifests = set.len(),
        diagnostics = set.diagnostics().len(),
        "loaded manifest set"
    );
    Ok(LoadOutcome::Complete(set))
}
