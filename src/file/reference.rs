//! Globally unique file identities
//!
//! A path alone cannot tell two files apart when the same path exists in
//! several image layers. Every observed file instance gets a [`Reference`]
//! minted from a [`ReferenceRegistry`] instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of one observed file instance
pub type FileId = u64;

/// A unique file, independent of its path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    id: FileId,
    /// Cleaned absolute path of the file
    pub path: String,
}

impl Reference {
    /// Rebuild a reference with a known id (e.g. when restoring a previous index)
    pub fn with_id(path: impl Into<String>, id: FileId) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    /// The unique id for this file reference
    pub fn id(&self) -> FileId {
        self.id
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.path)
    }
}

/// Mints references with strictly increasing ids
///
/// Ids are never reused for the lifetime of the registry, no matter how
/// many threads mint concurrently. The first id handed out is 1.
#[derive(Debug, Default)]
pub struct ReferenceRegistry {
    last_id: AtomicU64,
}

impl ReferenceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new reference for `path`
    pub fn mint(&self, path: impl Into<String>) -> Reference {
        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        Reference {
            id,
            path: path.into(),
        }
    }

    /// Number of references minted so far
    pub fn minted(&self) -> u64 {
        self.last_id.load(Ordering::Relaxed)
    }
}
