//! Error types with clear, actionable messages.
//!
//! Parse errors carry the source line so they can be turned into
//! diagnostics. Load and registry errors are hard failures that abort the
//! operation.

use std::path::PathBuf;

use thiserror::Error;

/// Why a single build descriptor could not be turned into a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The token stream did not match the descriptor grammar.
    #[error("line {line}: expected {expected}, found {found}")]
    Unexpected {
        line: usize,
        expected: String,
        found: String,
    },

    /// The file ended in the middle of a declaration.
    #[error("unexpected end of file: expected {expected}")]
    UnexpectedEof { expected: String },

    /// A string literal was never closed.
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    /// The descriptor is not UTF-8 text.
    #[error("line {line}: descriptor is not valid UTF-8. Re-save it with UTF-8 encoding")]
    InvalidEncoding { line: usize },

    /// A block comment was never closed.
    #[error("line {line}: unterminated block comment")]
    UnterminatedComment { line: usize },

    /// The declared class does not match the module directory.
    #[error(
        "line {line}: module class '{class}' does not match its directory '{directory}'. Rename the class or move the descriptor to Source/{class}/"
    )]
    IdentifierMismatch {
        class: String,
        directory: String,
        line: usize,
    },

    /// The constructor name differs from the class name.
    #[error("line {line}: constructor '{found}' does not match class '{class}'")]
    ConstructorMismatch {
        class: String,
        found: String,
        line: usize,
    },

    /// `PCHUsage` was assigned an enumerant outside the known set.
    #[error("line {line}: unknown PCH usage mode '{value}'. Valid modes: {valid}")]
    UnknownPchUsage {
        line: usize,
        value: String,
        valid: String,
    },

    /// The descriptor never assigns `PCHUsage`.
    #[error(
        "module '{module}': missing PCHUsage assignment. Add: PCHUsage = PCHUsageMode.UseExplicitOrSharedPCHs;"
    )]
    MissingPchUsage { module: String },

    /// `PCHUsage` assigned inside a conditional block.
    #[error("line {line}: PCHUsage may only be assigned outside conditional blocks")]
    PchInConditional { line: usize },

    /// A conditional block nested in another one.
    #[error("line {line}: nested conditional blocks are not supported")]
    NestedConditional { line: usize },

    /// `else if` chains cannot be expressed as independent blocks.
    #[error("line {line}: 'else if' chains are not supported, use separate 'if' blocks")]
    ElseIfChain { line: usize },

    /// A dependency string that cannot name a module.
    #[error("line {line}: '{name}' is not a valid module name")]
    InvalidModuleName { line: usize, name: String },
}

impl ParseError {
    /// Source line the error points at, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Unexpected { line, .. }
            | ParseError::UnterminatedString { line }
            | ParseError::InvalidEncoding { line }
            | ParseError::UnterminatedComment { line }
            | ParseError::IdentifierMismatch { line, .. }
            | ParseError::ConstructorMismatch { line, .. }
            | ParseError::UnknownPchUsage { line, .. }
            | ParseError::PchInConditional { line }
            | ParseError::NestedConditional { line }
            | ParseError::ElseIfChain { line }
            | ParseError::InvalidModuleName { line, .. } => Some(*line),
            ParseError::UnexpectedEof { .. } | ParseError::MissingPchUsage { .. } => None,
        }
    }

    /// Create an unexpected-token error.
    pub fn unexpected(line: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Unexpected {
            line,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an unexpected end-of-file error.
    pub fn eof(expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            expected: expected.into(),
        }
    }
}

/// Failures that abort loading a manifest set.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The discovery root is missing or not a directory.
    #[error("plugins root '{}' does not exist or is not a directory", .path.display())]
    MissingRoot { path: PathBuf },

    /// A directory or descriptor could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A background parse task panicked or was aborted.
    #[error("manifest loading task failed: {details}")]
    Task { details: String },
}

impl LoadError {
    /// Create an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures loading a host module registry file.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry file could not be read.
    #[error("failed to read host module registry {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The registry file is not valid TOML or has the wrong shape.
    #[error("failed to parse host module registry {}: {details}", .path.display())]
    Parse { path: PathBuf, details: String },

    /// The same module is listed twice.
    #[error("host module '{name}' is listed more than once")]
    DuplicateModule { name: String },
}
