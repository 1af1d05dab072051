//! Error types for caseport operations

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Core error type for caseport operations
#[derive(Error, Debug)]
pub enum CaseportError {
    // === Collection errors (E001-E003) ===
    /// E001: A test source file could not be parsed
    #[error("E001: {}:{line}:{column}: syntax error: {message}", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// E002: The collection root does not exist
    #[error("E002: path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    /// E003: A file or directory could not be read
    #[error("E003: failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Configuration errors (E004) ===
    /// E004: Configuration could not be loaded or is malformed
    #[error("E004: configuration error{}: {message}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    ConfigLoad {
        path: Option<PathBuf>,
        message: String,
    },

    // === Record errors (E005) ===
    /// E005: A required field has no value after defaults were applied
    #[error("E005: {}: {qualified_id}: missing required field '{field}'", path.display())]
    MissingRequiredField {
        path: PathBuf,
        qualified_id: String,
        field: String,
    },

    // === Markup errors (E006) ===
    /// E006: Structured text could not be parsed
    #[error("E006: malformed markup at line {line}: {message}")]
    Markup { line: usize, message: String },

    // === Traversal errors (E007) ===
    /// E007: Directory traversal failed
    #[error("E007: failed to walk {}: {message}", path.display())]
    Walk { path: PathBuf, message: String },
}

impl CaseportError {
    /// Get the error code (e.g., "E001", "E002")
    pub fn code(&self) -> &'static str {
        match self {
            CaseportError::Syntax { .. } => "E001",
            CaseportError::PathNotFound { .. } => "E002",
            CaseportError::Io { .. } => "E003",
            CaseportError::ConfigLoad { .. } => "E004",
            CaseportError::MissingRequiredField { .. } => "E005",
            CaseportError::Markup { .. } => "E006",
            CaseportError::Walk { .. } => "E007",
        }
    }

    /// Get the file path associated with this error, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            CaseportError::Syntax { path, .. }
            | CaseportError::PathNotFound { path }
            | CaseportError::Io { path, .. }
            | CaseportError::MissingRequiredField { path, .. }
            | CaseportError::Walk { path, .. } => Some(path),
            CaseportError::ConfigLoad { path, .. } => path.as_deref(),
            CaseportError::Markup { .. } => None,
        }
    }

    /// Get the qualified test id associated with this error, if any
    pub fn qualified_id(&self) -> Option<&str> {
        match self {
            CaseportError::MissingRequiredField { qualified_id, .. } => Some(qualified_id),
            _ => None,
        }
    }

    /// Get the line number associated with this error, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            CaseportError::Syntax { line, .. } | CaseportError::Markup { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Get the exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            CaseportError::Syntax { .. } | CaseportError::MissingRequiredField { .. } => 1,

            CaseportError::PathNotFound { .. }
            | CaseportError::Io { .. }
            | CaseportError::Walk { .. } => 2, // File errors

            CaseportError::Markup { .. } => 3,

            CaseportError::ConfigLoad { .. } => 4, // Configuration error
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CaseportError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(path: Option<&Path>, message: impl Into<String>) -> Self {
        CaseportError::ConfigLoad {
            path: path.map(Path::to_path_buf),
            message: message.into(),
        }
    }
}
