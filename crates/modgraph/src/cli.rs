//! CLI command implementations.
//!
//! Each command writes its output to `out` and returns an [`Outcome`]
//! that `main` turns into the process exit status. Findings about the
//! manifests go into the output; only I/O and usage failures are errors.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use tracing::info;

use crate::config::BuildSelection;
use crate::diagnostics::{Diagnostic, Report, Severity};
use crate::graph::DependencyGraph;
use crate::loader::{self, LoadOptions, LoadOutcome, ManifestSet};
use crate::manifest::{BuildConfig, serialize};
use crate::registry::HostModuleRegistry;
use crate::resolver::{build_order, resolve};
use crate::validator::{check, validate};

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No error-severity findings.
    Clean,
    /// At least one error-severity finding.
    Errors,
    /// The command could not complete (I/O failure or cancellation).
    Failed,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Clean => 0,
            Outcome::Errors => 1,
            Outcome::Failed => 2,
        }
    }

    fn from_report(report: &Report) -> Self {
        if report.has_errors() {
            Outcome::Errors
        } else {
            Outcome::Clean
        }
    }
}

/// Output format of `validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Output format of `graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GraphFormat {
    #[default]
    Json,
    Dot,
}

/// A single configuration, for commands that produce one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SingleConfig {
    #[default]
    Editor,
    Runtime,
}

impl SingleConfig {
    pub fn build_config(self) -> BuildConfig {
        match self {
            SingleConfig::Editor => BuildConfig::editor(),
            SingleConfig::Runtime => BuildConfig::runtime(),
        }
    }
}

/// Load the host registry from `path`, or the built-in stub.
pub fn load_registry(path: Option<&Path>) -> Result<HostModuleRegistry> {
    match path {
        Some(path) => HostModuleRegistry::load(path)
            .with_context(|| format!("failed to load host module registry {}", path.display())),
        None => Ok(HostModuleRegistry::stub()),
    }
}

/// Load the manifest set under `root`. `None` when cancelled.
pub async fn load_set(root: &Path, options: &LoadOptions) -> Result<Option<ManifestSet>> {
    let outcome = loader::load(root, options)
        .await
        .with_context(|| format!("failed to load manifests from {}", root.display()))?;
    match outcome {
        LoadOutcome::Complete(set) => {
            info!(root = %root.display(), manifests = set.len(), "manifest set ready");
            Ok(Some(set))
        }
        LoadOutcome::Cancelled => Ok(None),
    }
}

#[derive(Serialize)]
struct Summary {
    errors: usize,
    warnings: usize,
    notes: usize,
}

#[derive(Serialize)]
struct ValidationOutput<'a> {
    root: String,
    configs: Vec<String>,
    manifests: usize,
    diagnostics: &'a [Diagnostic],
    summary: Summary,
}

/// Resolve under every selected configuration and print the report.
pub fn cmd_validate(
    out: &mut dyn Write,
    set: &ManifestSet,
    registry: &HostModuleRegistry,
    selection: BuildSelection,
    format: ReportFormat,
) -> Result<Outcome> {
    let configs = selection.configs();
    let (_, report) = check(set, registry, &configs);

    match format {
        ReportFormat::Text => {
            writeln!(
                out,
                "Checked {} module(s) under {} ({selection} configuration)",
                set.len(),
                set.root().display()
            )?;
            out.write_all(report.render_text().as_bytes())?;
        }
        ReportFormat::Json => {
            let output = ValidationOutput {
                root: set.root().display().to_string(),
                configs: configs.iter().map(BuildConfig::label).collect(),
                manifests: set.len(),
                diagnostics: report.diagnostics(),
                summary: Summary {
                    errors: report.count(Severity::Error),
                    warnings: report.count(Severity::Warning),
                    notes: report.count(Severity::Note),
                },
            };
            serde_json::to_writer_pretty(&mut *out, &output)?;
            writeln!(out)?;
        }
    }

    Ok(Outcome::from_report(&report))
}

/// Print the resolved graph for one configuration. Error findings go to
/// `err` so that `out` stays machine-readable.
pub fn cmd_graph(
    out: &mut dyn Write,
    err: &mut dyn Write,
    set: &ManifestSet,
    registry: &HostModuleRegistry,
    config: SingleConfig,
    format: GraphFormat,
) -> Result<Outcome> {
    let resolution = resolve(set, registry, &config.build_config());
    let graph = DependencyGraph::from_resolution(&resolution, registry);
    match format {
        GraphFormat::Json => out.write_all(graph.to_json()?.as_bytes())?,
        GraphFormat::Dot => out.write_all(graph.to_dot().as_bytes())?,
    }

    let report = validate(set, std::slice::from_ref(&resolution), registry);
    if report.has_errors() {
        for diagnostic in report.diagnostics().iter().filter(|d| d.is_error()) {
            writeln!(err, "{diagnostic}")?;
        }
    }
    Ok(Outcome::from_report(&report))
}

/// Table of discovered manifests.
pub fn cmd_list(out: &mut dyn Write, set: &ManifestSet) -> Result<Outcome> {
    if set.is_empty() {
        writeln!(out, "No modules found under {}.", set.root().display())?;
    } else {
        writeln!(
            out,
            "{:<28} {:<24} {:<24} {:>6} {:>7} {:>11}",
            "MODULE", "PLUGIN", "PCH", "PUBLIC", "PRIVATE", "CONDITIONAL"
        )?;
        writeln!(out, "{}", "-".repeat(105))?;
        for entry in set.entries() {
            let manifest = &entry.manifest;
            writeln!(
                out,
                "{:<28} {:<24} {:<24} {:>6} {:>7} {:>11}",
                manifest.name,
                entry.plugin,
                manifest.pch_usage.as_str(),
                manifest.public.len(),
                manifest.private.len(),
                manifest.conditionals.len()
            )?;
        }
    }

    let report: Report = set.diagnostics().iter().cloned().collect();
    if report.has_errors() {
        writeln!(out)?;
        out.write_all(report.finish().render_text().as_bytes())?;
        return Ok(Outcome::Errors);
    }
    Ok(Outcome::Clean)
}

/// Print a build order: every module after the modules it depends on.
pub fn cmd_order(
    out: &mut dyn Write,
    err: &mut dyn Write,
    set: &ManifestSet,
    registry: &HostModuleRegistry,
    config: SingleConfig,
) -> Result<Outcome> {
    let resolution = resolve(set, registry, &config.build_config());
    match build_order(&resolution) {
        Ok(order) => {
            for (i, name) in order.iter().enumerate() {
                writeln!(out, "{:>3}. {name}", i + 1)?;
            }
            Ok(Outcome::Clean)
        }
        Err(e) => {
            writeln!(err, "error: {e}")?;
            Ok(Outcome::Errors)
        }
    }
}

/// Print one module's descriptor in canonical form.
pub fn cmd_show(
    out: &mut dyn Write,
    err: &mut dyn Write,
    set: &ManifestSet,
    module: &str,
) -> Result<Outcome> {
    let Some(manifest) = set.manifest(module) else {
        writeln!(
            err,
            "error: module '{module}' not found under {}. Run 'modgraph list {}' to see available modules.",
            set.root().display(),
            set.root().display()
        )?;
        return Ok(Outcome::Errors);
    };
    out.write_all(serialize(manifest).as_bytes())?;
    Ok(Outcome::Clean)
}
