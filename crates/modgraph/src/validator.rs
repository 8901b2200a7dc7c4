//! Set-level validation.
//!
//! Merges loader and resolver findings with the checks that do not depend
//! on a build configuration, producing one sorted [`Report`].

use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Report};
use crate::loader::ManifestSet;
use crate::manifest::{BuildConfig, Condition, Predicate, PredicateRef};
use crate::registry::ModuleLookup;
use crate::resolver::{Resolution, resolve};

/// Build the diagnostic report for `set` given its resolutions.
pub fn validate(set: &ManifestSet, resolutions: &[Resolution], registry: &dyn ModuleLookup) -> Report {
    let mut report = Report::new();
    report.extend(set.diagnostics().iter().cloned());
    for resolution in resolutions {
        report.extend(resolution.diagnostics.iter().cloned());
    }

    for entry in set.entries() {
        let manifest = &entry.manifest;
        let name = manifest.name.as_str();

        for block in &manifest.conditionals {
            if let PredicateRef::Unknown(expression) = &block.condition.predicate {
                report.push(
                    Diagnostic::new(
                        DiagnosticKind::UnknownPredicate,
                        format!(
                            "conditional block in '{name}' tests unsupported predicate '{expression}' (supported: {}); it never applies",
                            Predicate::supported()
                        ),
                    )
                    .for_module(name)
                    .at(&entry.path, block.line),
                );
            }
            if block.is_empty() && block.unknown.is_empty() {
                report.push(
                    Diagnostic::new(
                        DiagnosticKind::EmptyConditional,
                        format!("conditional block '{}' in '{name}' adds no dependencies", block.condition),
                    )
                    .for_module(name)
                    .at(&entry.path, block.line),
                );
            }
        }

        for edge in manifest.edges() {
            if set.contains(edge.to) || !registry.is_editor_only(edge.to) {
                continue;
            }
            if edge.condition.is_some_and(Condition::is_editor_only) {
                continue;
            }
            let place = match edge.condition {
                None => "the base block".to_string(),
                Some(condition) => format!("a '{condition}' block"),
            };
            report.push(
                Diagnostic::new(
                    DiagnosticKind::EditorOnlyReference,
                    format!(
                        "editor-only module '{}' is a {} dependency of '{name}' in {place}; move it into an `if (Target.bBuildEditor)` block",
                        edge.to, edge.visibility
                    ),
                )
                .for_module(name)
                .at(&entry.path, edge.line),
            );
        }
    }

    let report = report.finish();
    debug!(
        manifests = set.len(),
        diagnostics = report.len(),
        "validated manifest set"
    );
    report
}

/// Resolve `set` under every configuration in `configs` and validate.
pub fn check(
    set: &ManifestSet,
    registry: &dyn ModuleLookup,
    configs: &[BuildConfig],
) -> (Vec<Resolution>, Report) {
    let resolutions: Vec<Resolution> = configs
        .iter()
        .map(|config| resolve(set, registry, config))
        .collect();
    let report = validate(set, &resolutions, registry);
    (resolutions, report)
}
