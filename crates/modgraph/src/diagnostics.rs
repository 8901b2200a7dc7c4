//! Diagnostics accumulated while loading, resolving and validating manifests.
//!
//! Nothing in the pipeline panics or aborts on a bad manifest. Each stage
//! appends [`Diagnostic`] values and hands them back alongside whatever
//! partial result it produced; a [`Report`] collects them for display.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// How serious a diagnostic is. Ordered so that `max()` yields the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational only.
    Note,
    /// Surfaced to the user but does not block use of the set.
    Warning,
    /// Blocks use of the manifest set.
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Malformed descriptor; the manifest is skipped.
    ParseError,
    /// A second manifest declared an identifier already in the set.
    DuplicateIdentifier,
    /// Conditional block guarded by a predicate outside the supported set.
    UnknownPredicate,
    /// A module is both a public and a private dependency.
    PublicPrivateOverlap,
    /// A dependency names neither a manifest nor a host module.
    UnresolvedReference,
    /// Manifests form a cycle through public dependencies.
    PublicCycle,
    /// A manifest lists itself as a dependency.
    SelfDependency,
    /// An editor-only host module is referenced outside an editor block.
    EditorOnlyReference,
    /// The same name appears twice in one dependency list.
    DuplicateEntry,
    /// Unrecognized statement kept verbatim.
    UnknownField,
    /// A conditional block that adds nothing.
    EmptyConditional,
    /// A module directory without a build descriptor.
    MissingDescriptor,
}

impl DiagnosticKind {
    /// Stable short code used in rendered output.
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::ParseError => "parse-error",
            DiagnosticKind::DuplicateIdentifier => "duplicate-identifier",
            DiagnosticKind::UnknownPredicate => "unknown-predicate",
            DiagnosticKind::PublicPrivateOverlap => "public-private-overlap",
            DiagnosticKind::UnresolvedReference => "unresolved-reference",
            DiagnosticKind::PublicCycle => "public-cycle",
            DiagnosticKind::SelfDependency => "self-dependency",
            DiagnosticKind::EditorOnlyReference => "editor-only-reference",
            DiagnosticKind::DuplicateEntry => "duplicate-entry",
            DiagnosticKind::UnknownField => "unknown-field",
            DiagnosticKind::EmptyConditional => "empty-conditional",
            DiagnosticKind::MissingDescriptor => "missing-descriptor",
        }
    }

    /// Severity this kind is reported with.
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::ParseError
            | DiagnosticKind::DuplicateIdentifier
            | DiagnosticKind::UnknownPredicate
            | DiagnosticKind::PublicPrivateOverlap
            | DiagnosticKind::UnresolvedReference
            | DiagnosticKind::PublicCycle
            | DiagnosticKind::SelfDependency => Severity::Error,
            DiagnosticKind::EditorOnlyReference
            | DiagnosticKind::DuplicateEntry
            | DiagnosticKind::UnknownField => Severity::Warning,
            DiagnosticKind::EmptyConditional | DiagnosticKind::MissingDescriptor => Severity::Note,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single finding, optionally tied to a manifest and a source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic with the default severity of `kind`.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            module: None,
            path: None,
            line: None,
            message: message.into(),
        }
    }

    /// Attach the source file and line.
    pub fn at(mut self, path: impl Into<PathBuf>, line: usize) -> Self {
        self.path = Some(path.into());
        self.line = (line > 0).then_some(line);
        self
    }

    /// Attach the source file without a line.
    pub fn in_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach the manifest identifier the finding is about.
    pub fn for_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    fn sort_key(&self) -> (Option<&Path>, Option<usize>, std::cmp::Reverse<Severity>, DiagnosticKind, Option<&str>, &str) {
        (
            self.path.as_deref(),
            self.line,
            std::cmp::Reverse(self.severity),
            self.kind,
            self.module.as_deref(),
            &self.message,
        )
    }

    fn location(&self) -> Option<String> {
        let path = self.path.as_ref()?;
        Some(match self.line {
            Some(line) => format!("{}:{line}", path.display()),
            None => path.display().to_string(),
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.severity, self.kind)?;
        if let Some(location) = self.location() {
            write!(f, " {location}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// An ordered, de-duplicated collection of diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Sort by (path, line) and drop exact duplicates.
    pub fn finish(mut self) -> Self {
        self.diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.diagnostics.dedup();
        self
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Human-readable rendering: grouped by severity (errors first), each
    /// group in source-location order, followed by a summary line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for severity in [Severity::Error, Severity::Warning, Severity::Note] {
            let group: Vec<_> = self
                .diagnostics
                .iter()
                .filter(|d| d.severity == severity)
                .collect();
            if group.is_empty() {
                continue;
            }
            out.push_str(&format!("{severity}s ({}):\n", group.len()));
            for diagnostic in group {
                out.push_str(&format!("  {diagnostic}\n"));
            }
        }
        out.push_str(&format!(
            "{} error(s), {} warning(s), {} note(s)\n",
            self.count(Severity::Error),
            self.count(Severity::Warning),
            self.count(Severity::Note)
        ));
        out
    }
}

impl FromIterator<Diagnostic> for Report {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            diagnostics: iter.into_iter().collect(),
        }
    }
}
