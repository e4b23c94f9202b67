//! Error types for streplace.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for substitution runs.
#[derive(Error, Debug)]
pub enum StreplaceError {
    #[error("Rule '{rule}' {reason} (separator '{separator}')")]
    MalformedRule {
        rule: String,
        separator: String,
        reason: String,
    },

    #[error("Can't handle empty left side of rule '{rule}'")]
    EmptyPattern { rule: String },

    #[error("Rule '{rule}' has control chars in its right side, which make no sense in file names (use --force to allow)")]
    ControlCharsInName { rule: String },

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Conflicting modes: {0}")]
    ConflictingModes(String),

    #[error("'{}': No such file or directory", .0.display())]
    PathNotFound(PathBuf),

    #[error("No rules given (specify at least one rule of the form FOO=BAR to replace FOO by BAR)")]
    NoRules,

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoUnknown(#[from] std::io::Error),
}

impl StreplaceError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StreplaceError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for failures of the filesystem layer.
    pub fn is_io(&self) -> bool {
        matches!(self, StreplaceError::Io { .. } | StreplaceError::IoUnknown(_))
    }
}

/// A specialized Result type for streplace operations.
pub type Result<T> = std::result::Result<T, StreplaceError>;
