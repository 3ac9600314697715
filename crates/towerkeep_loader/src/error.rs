use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// What kind of file a document refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Tileset,
    Image,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Tileset => f.write_str("tileset"),
            ReferenceKind::Image => f.write_str("image"),
        }
    }
}

/// Error type for map loading failures. Fatal to loading the map.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML in {}: {message}", .path.display())]
    Xml { path: PathBuf, message: String },
    #[error("invalid map format in {}: {message}", .path.display())]
    InvalidFormat { path: PathBuf, message: String },
    #[error(
        "{kind} reference '{declared}' in {} does not exist at {}",
        .document.display(),
        .resolved.display()
    )]
    MissingReference {
        kind: ReferenceKind,
        declared: String,
        resolved: PathBuf,
        document: PathBuf,
    },
    #[error("unsupported {feature} in {}", .path.display())]
    Unsupported { path: PathBuf, feature: String },
    #[error("{} failed to load and has no repairable references", .path.display())]
    Unrepairable {
        path: PathBuf,
        #[source]
        cause: Box<LoadError>,
    },
    #[error("repaired map {} still fails to load", .fixed.display())]
    RepairFailed {
        fixed: PathBuf,
        #[source]
        cause: Box<LoadError>,
    },
}

impl LoadError {
    pub(crate) fn invalid(path: &Path, message: impl Into<String>) -> Self {
        LoadError::InvalidFormat {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(path: &Path, feature: impl Into<String>) -> Self {
        LoadError::Unsupported {
            path: path.to_path_buf(),
            feature: feature.into(),
        }
    }

    /// Whether the document at `path` itself could not be read
    pub fn is_unreadable_document(&self, path: &Path) -> bool {
        matches!(self, LoadError::Io { path: p, .. } if p == path)
    }
}

/// A corrected file could not be written. Loading degrades to the in-memory
/// corrected documents instead of failing.
#[derive(Debug, Error)]
#[error("failed to write {}: {source}", .path.display())]
pub struct RepairWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
