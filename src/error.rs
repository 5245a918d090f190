//! Error types for layerscope
//!
//! All modules use `LayerResult<T>` as their return type.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for layerscope operations
pub type LayerResult<T> = Result<T, LayerError>;

/// All errors that can occur while acquiring and indexing an image
#[derive(Error, Debug)]
pub enum LayerError {
    // Tar content errors
    #[error("file {0} not found in tar")]
    NotFound(String),

    #[error("not all files found in tar: {}", .missing.join(", "))]
    PartialBatchMiss { missing: Vec<String> },

    #[error("failed to read next tar header: {source}")]
    TarRead {
        #[source]
        source: std::io::Error,
    },

    // Scratch space errors
    #[error("could not create scratch directory under {root}: {source}")]
    ResourceExhaustion {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete scratch directories: {}", format_failed(.failed))]
    CleanupFailed { failed: Vec<(PathBuf, std::io::Error)> },

    // Acquisition errors
    #[error("cannot provide an empty image: {image}")]
    EmptyTransfer { image: String },

    #[error("{context}: {reason}")]
    Upstream { context: String, reason: String },

    #[error("could not decode image archive {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("saving {image} did not finish within {}s", .after.as_secs())]
    SaveTimedOut { image: String, after: Duration },

    #[error("unable to parse image identifier {reference}: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("unable to determine image source: {0}")]
    UnknownSource(String),

    #[error("Container CLI not found: {name}")]
    DaemonCliNotFound { name: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    User(String),
}

fn format_failed(failed: &[(PathBuf, std::io::Error)]) -> String {
    failed
        .iter()
        .map(|(dir, err)| format!("{} ({})", dir.display(), err))
        .collect::<Vec<_>>()
        .join("; ")
}

impl LayerError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an error for a failed daemon or collaborator call
    pub fn upstream(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Upstream {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Create a decoding error for an archive on disk
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if retrying the whole acquisition could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::SaveTimedOut { .. } | Self::EmptyTransfer { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::DaemonCliNotFound { .. } => {
                Some("Install docker or podman, or set daemon.command in the config")
            }
            Self::SaveTimedOut { .. } => Some("Raise daemon.save_timeout_secs in the config"),
            Self::UnknownSource(_) => {
                Some("Prefix the image with docker: or tarball: (e.g. tarball:./image.tar)")
            }
            Self::ResourceExhaustion { .. } => Some("Set scratch.root to a writable directory"),
            _ => None,
        }
    }
}
