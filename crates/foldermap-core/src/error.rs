//! Error types for synchronisation operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or saving a tree.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The bound path does not exist.
    #[error("Path not found: {path}")]
    PathNotFound { path: PathBuf },

    /// A container is bound to something that is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A leaf is bound to something that is not a regular file.
    #[error("Not a file: {path}")]
    NotAFile { path: PathBuf },

    /// The node has no binding and none can be derived.
    #[error("Node is not bound to a path")]
    Unbound,

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The codec rejected the file contents or the values to encode.
    #[error("Codec error at {path}: {message}")]
    Codec { path: PathBuf, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A file name rejected before touching the disk.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// No entry under a key.
    #[error("No entry named '{key}'")]
    KeyNotFound { key: String },

    /// An entry already uses the key.
    #[error("An entry named '{key}' already exists")]
    KeyExists { key: String },
}

impl SyncError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::PathNotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a codec error with path context.
    pub fn codec(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Codec {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// The issue kind used when this error is recorded on a signal.
    pub fn kind(&self) -> IssueKind {
        match self {
            Self::PathNotFound { .. } => IssueKind::PathNotFound,
            Self::NotADirectory { .. } => IssueKind::NotADirectory,
            Self::NotAFile { .. } => IssueKind::NotAFile,
            Self::Unbound => IssueKind::Unbound,
            Self::Io { .. } => IssueKind::Io,
            Self::Codec { .. } => IssueKind::Codec,
            Self::InvalidConfig { .. } => IssueKind::InvalidConfig,
            Self::InvalidName { .. } => IssueKind::InvalidName,
            Self::KeyNotFound { .. } | Self::KeyExists { .. } => IssueKind::Key,
        }
    }

    /// The path this error is about, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::PathNotFound { path }
            | Self::NotADirectory { path }
            | Self::NotAFile { path }
            | Self::Io { path, .. }
            | Self::Codec { path, .. } => Some(path),
            Self::Unbound
            | Self::InvalidConfig { .. }
            | Self::InvalidName { .. }
            | Self::KeyNotFound { .. }
            | Self::KeyExists { .. } => None,
        }
    }
}

/// Kind of a recorded issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    PathNotFound,
    NotADirectory,
    NotAFile,
    Unbound,
    Io,
    Codec,
    InvalidConfig,
    InvalidName,
    /// Missing or duplicate entry key.
    Key,
    /// One or more children of a container failed.
    ChildOperationFailed,
}

/// Non-fatal failure recorded on a signal or in a save report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncIssue {
    /// Path the issue is about (empty when the node was unbound).
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of issue.
    pub kind: IssueKind,
}

impl SyncIssue {
    /// Create a new issue.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: IssueKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create an aggregated child-failure issue for a container.
    pub fn child_failed(path: impl Into<PathBuf>, failed: usize) -> Self {
        let path = path.into();
        Self {
            message: format!("{failed} child operation(s) failed under {}", path.display()),
            path,
            kind: IssueKind::ChildOperationFailed,
        }
    }
}

impl From<&SyncError> for SyncIssue {
    fn from(error: &SyncError) -> Self {
        Self {
            path: error.path().cloned().unwrap_or_default(),
            message: error.to_string(),
            kind: error.kind(),
        }
    }
}

impl std::fmt::Display for SyncIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}
