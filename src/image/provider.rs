//! Image acquisition strategies
//!
//! A provider turns a source location into a decoded [`Image`] with its
//! tags. The tarball provider decodes an archive already on disk; the
//! daemon provider first saves the image from a container daemon into a
//! scratch directory.

use crate::daemon::{DaemonClient, ExportStream};
use crate::error::{LayerError, LayerResult};
use crate::event::{Event, EventBus, EventKind};
use crate::image::{archive, Image, ImageReference};
use crate::progress::{AggregateProgress, SizedProgress, Strategy, TimedProgress};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

/// File name daemon images are staged under inside a scratch directory
pub const IMAGE_TAR_NAME: &str = "image.tar";

/// Observed `docker save` throughput, used to estimate save duration
const DEFAULT_THROUGHPUT_BYTES_PER_SEC: u64 = 150 * 1024 * 1024;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Tuning for daemon saves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveSettings {
    /// Assumed save throughput for the time-based progress estimate
    pub throughput_bytes_per_sec: u64,
    /// Give up on a save that takes longer than this
    pub timeout: Option<Duration>,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            throughput_bytes_per_sec: DEFAULT_THROUGHPUT_BYTES_PER_SEC,
            timeout: None,
        }
    }
}

/// Expected duration of saving `size` bytes at `throughput` bytes per second
pub fn estimate_save_time(size: u64, throughput_bytes_per_sec: u64) -> Duration {
    let secs = size as f64 / throughput_bytes_per_sec.max(1) as f64;
    Duration::from_millis((secs * 1000.0) as u64)
}

/// Decodes an existing `docker save` archive
#[derive(Debug, Clone)]
pub struct TarballProvider {
    path: PathBuf,
}

impl TarballProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn provide(&self) -> LayerResult<Image> {
        decode_with_tags(self.path.clone()).await
    }
}

/// Saves an image from a container daemon into a scratch directory
pub struct DaemonProvider {
    image_ref: ImageReference,
    cache_dir: PathBuf,
    client: Arc<dyn DaemonClient>,
    bus: EventBus,
    settings: SaveSettings,
}

impl DaemonProvider {
    pub fn new(
        image_ref: ImageReference,
        cache_dir: impl Into<PathBuf>,
        client: Arc<dyn DaemonClient>,
        bus: EventBus,
    ) -> Self {
        Self {
            image_ref,
            cache_dir: cache_dir.into(),
            client,
            bus,
            settings: SaveSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SaveSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn image_ref(&self) -> &ImageReference {
        &self.image_ref
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub async fn provide(&self) -> LayerResult<Image> {
        let tar_path = self.cache_dir.join(IMAGE_TAR_NAME);
        let mut tar_file = File::create(&tar_path).await.map_err(|e| {
            LayerError::io(
                format!("unable to create temp file for image {}", tar_path.display()),
                e,
            )
        })?;

        let name = self.image_ref.name();
        let inspect = self.client.inspect(&name).await?;

        let expected = estimate_save_time(inspect.virtual_size, self.settings.throughput_bytes_per_sec);
        let estimate = Arc::new(TimedProgress::new(expected));
        let copied = Arc::new(SizedProgress::new(inspect.virtual_size));
        let progress = Arc::new(
            AggregateProgress::new(Strategy::Normalize)
                .with_source("estimate", estimate.clone())
                .with_source("copy", copied.clone()),
        );

        self.bus.publish(Event {
            kind: EventKind::SaveImage,
            image: name.clone(),
            progress,
        });
        debug!(
            image = %name,
            daemon = self.client.daemon_name(),
            virtual_size = inspect.virtual_size,
            expected_ms = expected.as_millis() as u64,
            "saving image"
        );

        let mut export = self.client.save(&[name.clone()]).await?;

        // real bytes are flowing; stop estimating
        estimate.set_completed();

        let copy = copy_with_progress(&mut *export, &mut tar_file, &copied);
        let n_bytes = match self.settings.timeout {
            Some(after) => tokio::time::timeout(after, copy)
                .await
                .map_err(|_| LayerError::SaveTimedOut {
                    image: name.clone(),
                    after,
                })?,
            None => copy.await,
        }
        .map_err(|e| LayerError::io("unable to save image to tar", e))?;

        close_export(export, &tar_path).await?;
        drop(tar_file);

        if n_bytes == 0 {
            return Err(LayerError::EmptyTransfer { image: name });
        }
        copied.set_completed();
        info!(image = %name, bytes = n_bytes, "saved image");

        decode_with_tags(tar_path).await
    }
}

/// The acquisition strategy for one image source
pub enum ImageProvider {
    Tarball(TarballProvider),
    Daemon(DaemonProvider),
}

impl ImageProvider {
    /// Acquire and decode the image, with its tags attached
    pub async fn provide(&self) -> LayerResult<Image> {
        match self {
            ImageProvider::Tarball(provider) => provider.provide().await,
            ImageProvider::Daemon(provider) => provider.provide().await,
        }
    }
}

async fn close_export(export: Box<dyn ExportStream>, tar_path: &Path) -> LayerResult<()> {
    export.close().await.map_err(|e| {
        error!(file = %tar_path.display(), "image export failed: {}", e);
        e
    })
}

/// Copy `reader` into `writer`, feeding every chunk to `progress`
async fn copy_with_progress<R, W>(
    reader: &mut R,
    writer: &mut W,
    progress: &SizedProgress,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        progress.add(n as u64);
        total += n as u64;
    }
    writer.flush().await?;
    Ok(total)
}

/// Decode the archive and attach its tags, off the async worker threads
async fn decode_with_tags(path: PathBuf) -> LayerResult<Image> {
    tokio::task::spawn_blocking(move || {
        let image = archive::decode(&path)?;
        let tags = archive::extract_tags(&path)?;
        Ok(image.with_tags(tags))
    })
    .await
    .map_err(|e| LayerError::upstream("decoding image archive", e.to_string()))?
}
