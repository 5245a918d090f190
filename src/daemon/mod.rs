//! Container daemon access
//!
//! The daemon is reached through the [`DaemonClient`] trait so acquisition
//! logic does not care whether Docker or Podman answers, and tests can
//! substitute an in-memory daemon.

mod cli;
#[cfg(test)]
pub(crate) mod fake;

pub use cli::CliDaemonClient;

use crate::error::LayerResult;
use async_trait::async_trait;
use tokio::io::AsyncRead;

/// What image inspection reports
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageInspect {
    pub id: String,
    /// Uncompressed size of the image in bytes
    pub virtual_size: u64,
    pub repo_tags: Vec<String>,
}

/// Byte stream of an image export
///
/// Some daemons only report failure once the stream has ended, so callers
/// must [`close`](ExportStream::close) the stream after reading it.
#[async_trait]
pub trait ExportStream: AsyncRead + Send + Unpin {
    /// Release the stream and surface any failure reported by the daemon
    async fn close(self: Box<Self>) -> LayerResult<()>;
}

/// Abstract container daemon interface
#[async_trait]
pub trait DaemonClient: Send + Sync {
    /// Inspect an image by name
    async fn inspect(&self, image: &str) -> LayerResult<ImageInspect>;

    /// Export images as a `docker save` tar stream
    async fn save(&self, images: &[String]) -> LayerResult<Box<dyn ExportStream>>;

    /// Human-readable daemon name for display
    fn daemon_name(&self) -> &str;
}
