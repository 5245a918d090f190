//! Container images acquired as `docker save` archives
//!
//! An [`Image`] is decoded from an archive on disk and exposes its layers.
//! Each [`Layer`] can stream its file metadata, record a [`FileRecord`] per
//! file with a freshly minted [`Reference`], and fetch file contents, all
//! straight out of the archive.

pub mod archive;
mod provider;
mod reference;

pub use archive::{extract_tags, ImageConfig, ManifestEntry};
pub use provider::{
    estimate_save_time, DaemonProvider, ImageProvider, SaveSettings, TarballProvider,
    IMAGE_TAR_NAME,
};
pub use reference::{ImageReference, DEFAULT_TAG};

use crate::error::{LayerError, LayerResult};
use crate::file::{
    read_many, read_one, scan, Metadata, MetadataStream, Reference, ReferenceRegistry,
    TarContentsRequest, TarEntryReader,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where an image comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A `docker save` archive already on disk
    DockerTarball,
    /// A live container daemon
    DockerDaemon,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::DockerTarball => f.write_str("tarball"),
            Source::DockerDaemon => f.write_str("docker"),
        }
    }
}

impl Source {
    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "docker" | "docker-daemon" => Some(Source::DockerDaemon),
            "tarball" | "docker-archive" => Some(Source::DockerTarball),
            _ => None,
        }
    }
}

/// Split a user supplied image string into its source and location.
///
/// `docker:busybox:latest` and `tarball:./image.tar` select a source
/// explicitly (a `scheme://` form is accepted too). Anything without a
/// known scheme is treated as a daemon image reference.
pub fn parse_image_spec(user_input: &str) -> LayerResult<(Source, String)> {
    if let Some((scheme, rest)) = user_input.split_once("://") {
        let source = Source::from_scheme(scheme)
            .ok_or_else(|| LayerError::UnknownSource(scheme.to_string()))?;
        return Ok((source, rest.to_string()));
    }

    if let Some((scheme, rest)) = user_input.split_once(':') {
        if let Some(source) = Source::from_scheme(scheme) {
            return Ok((source, rest.to_string()));
        }
    }

    Ok((Source::DockerDaemon, user_input.to_string()))
}

/// One file observed in one layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub reference: Reference,
    pub metadata: Metadata,
}

/// One layer tarball inside an image archive
#[derive(Debug, Clone)]
pub struct Layer {
    index: usize,
    tar_path: String,
    diff_id: Option<String>,
    archive_path: PathBuf,
    files: Vec<FileRecord>,
}

impl Layer {
    pub(crate) fn new(
        index: usize,
        tar_path: String,
        diff_id: Option<String>,
        archive_path: &Path,
    ) -> Self {
        Self {
            index,
            tar_path,
            diff_id,
            archive_path: archive_path.to_path_buf(),
            files: Vec::new(),
        }
    }

    /// Position in the image, base layer first
    pub fn index(&self) -> usize {
        self.index
    }

    /// Entry name of this layer's tarball inside the image archive
    pub fn tar_path(&self) -> &str {
        &self.tar_path
    }

    pub fn diff_id(&self) -> Option<&str> {
        self.diff_id.as_deref()
    }

    /// Files recorded by [`Layer::read`], in archive order
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Recorded file at a cleaned absolute path. The last entry wins if the
    /// layer lists a path twice.
    pub fn file(&self, path: &str) -> Option<&FileRecord> {
        self.files.iter().rev().find(|f| f.metadata.path == path)
    }

    /// Open a reader over this layer's tarball
    pub fn open(&self) -> LayerResult<TarEntryReader<BufReader<File>>> {
        let file = File::open(&self.archive_path).map_err(|e| {
            LayerError::io(
                format!("opening image archive {}", self.archive_path.display()),
                e,
            )
        })?;
        read_one(BufReader::new(file), &self.tar_path)
    }

    /// Stream metadata for every file in the layer
    pub fn metadata(&self) -> LayerResult<MetadataStream> {
        Ok(scan(self.open()?))
    }

    /// Scan the layer and record every file under a new reference
    pub async fn read(&mut self, registry: &ReferenceRegistry) -> LayerResult<()> {
        let mut stream = self.metadata()?;
        let mut files = Vec::new();
        while let Some(item) = stream.recv().await {
            let metadata = item?;
            let reference = registry.mint(metadata.path.clone());
            files.push(FileRecord {
                reference,
                metadata,
            });
        }

        debug!(layer = self.index, files = files.len(), "read layer");
        self.files = files;
        Ok(())
    }

    /// Build a content request for recorded files at the given paths
    pub fn request_for<'a>(
        &self,
        paths: impl IntoIterator<Item = &'a str>,
    ) -> LayerResult<TarContentsRequest> {
        paths
            .into_iter()
            .map(|path| {
                self.file(path)
                    .map(|f| (f.metadata.tar_entry_name.clone(), f.reference.clone()))
                    .ok_or_else(|| LayerError::NotFound(path.to_string()))
            })
            .collect()
    }

    /// Fetch the contents of several files in one pass over the layer
    pub fn file_contents(
        &self,
        request: &TarContentsRequest,
    ) -> LayerResult<HashMap<Reference, Vec<u8>>> {
        read_many(self.open()?, request)
    }

    /// Stream one file by its tar entry name
    pub fn open_file(
        &self,
        tar_entry_name: &str,
    ) -> LayerResult<TarEntryReader<TarEntryReader<BufReader<File>>>> {
        read_one(self.open()?, tar_entry_name)
    }
}

/// A decoded image backed by an archive on disk
#[derive(Debug, Clone)]
pub struct Image {
    archive_path: PathBuf,
    manifest: ManifestEntry,
    config: ImageConfig,
    layers: Vec<Layer>,
    tags: BTreeSet<String>,
}

impl Image {
    pub(crate) fn new(
        archive_path: PathBuf,
        manifest: ManifestEntry,
        config: ImageConfig,
        layers: Vec<Layer>,
    ) -> Self {
        Self {
            archive_path,
            manifest,
            config,
            layers,
            tags: BTreeSet::new(),
        }
    }

    /// Attach the tags discovered for this image
    pub fn with_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Image id derived from the config blob name, e.g. `sha256:0123abcd`
    pub fn id(&self) -> String {
        let name = self
            .manifest
            .config
            .rsplit('/')
            .next()
            .unwrap_or(&self.manifest.config);
        let hex = name.strip_suffix(".json").unwrap_or(name);
        format!("sha256:{}", hex)
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn manifest(&self) -> &ManifestEntry {
        &self.manifest
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Scan every layer and record its files
    pub async fn read(&mut self, registry: &ReferenceRegistry) -> LayerResult<()> {
        for layer in &mut self.layers {
            layer.read(registry).await?;
        }
        Ok(())
    }
}
