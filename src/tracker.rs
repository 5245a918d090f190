//! Scratch directory bookkeeping
//!
//! Acquisitions stage their artifacts in temporary directories that must
//! outlive the acquisition itself (the decoded image keeps pointing into
//! them). The tracker remembers every directory it hands out until an
//! explicit [`ResourceTracker::cleanup`].

use crate::error::{LayerError, LayerResult};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Default name prefix for scratch directories
pub const DEFAULT_SCRATCH_PREFIX: &str = "layerscope-cache";

/// Creates and later removes scratch directories
#[derive(Debug)]
pub struct ResourceTracker {
    prefix: String,
    root: PathBuf,
    dirs: Mutex<Vec<PathBuf>>,
}

impl Default for ResourceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SCRATCH_PREFIX, std::env::temp_dir())
    }
}

impl ResourceTracker {
    /// Create a tracker placing directories named `<prefix>*` under `root`
    pub fn new(prefix: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            root: root.into(),
            dirs: Mutex::new(Vec::new()),
        }
    }

    /// Directory scratch space is created under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh, uniquely named, empty directory and track it
    pub fn new_scratch_dir(&self) -> LayerResult<PathBuf> {
        let dir = tempfile::Builder::new()
            .prefix(&self.prefix)
            .tempdir_in(&self.root)
            .map_err(|source| {
                error!(root = %self.root.display(), "could not create scratch directory: {}", source);
                LayerError::ResourceExhaustion {
                    root: self.root.clone(),
                    source,
                }
            })?
            .keep();

        debug!(dir = %dir.display(), "created scratch directory");
        self.dirs.lock().push(dir.clone());
        Ok(dir)
    }

    /// Directories created and not yet removed, in creation order
    pub fn tracked(&self) -> Vec<PathBuf> {
        self.dirs.lock().clone()
    }

    /// Remove every tracked directory.
    ///
    /// Each directory is attempted once, in creation order, regardless of
    /// earlier failures. Directories that could not be removed stay tracked
    /// and are reported together in one [`LayerError::CleanupFailed`].
    pub fn cleanup(&self) -> LayerResult<()> {
        let dirs = std::mem::take(&mut *self.dirs.lock());
        let mut failed = Vec::new();

        for dir in dirs {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => debug!(dir = %dir.display(), "deleted scratch directory"),
                Err(err) => {
                    error!(dir = %dir.display(), "failed to delete scratch directory: {}", err);
                    failed.push((dir, err));
                }
            }
        }

        if failed.is_empty() {
            return Ok(());
        }

        {
            let mut dirs = self.dirs.lock();
            let still_tracked: Vec<PathBuf> = failed.iter().map(|(dir, _)| dir.clone()).collect();
            dirs.splice(0..0, still_tracked);
        }
        Err(LayerError::CleanupFailed { failed })
    }
}
