//! Decoding of `docker save` archives
//!
//! The archive holds a `manifest.json` listing each image's config blob,
//! repo tags and layer tarballs. Only what is needed to navigate layers is
//! decoded here; layer contents stay in the archive until asked for.

use crate::error::{LayerError, LayerResult};
use crate::file::read_one;
use crate::image::{Image, Layer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Name of the manifest inside a `docker save` archive
pub const MANIFEST_FILE: &str = "manifest.json";

/// One image entry of `manifest.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManifestEntry {
    /// Tar entry name of the image config blob
    pub config: String,
    #[serde(default)]
    pub repo_tags: Option<Vec<String>>,
    /// Tar entry names of the layer tarballs, base layer first
    pub layers: Vec<String>,
}

/// The parts of the image config this crate reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub rootfs: RootFs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootFs {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub diff_ids: Vec<String>,
}

/// Decode the single image held by the archive at `path`.
///
/// The returned image has no tags attached; see [`extract_tags`].
pub fn decode(path: &Path) -> LayerResult<Image> {
    let manifest = read_manifest(path)?;
    let entry = match manifest.as_slice() {
        [entry] => entry.clone(),
        [] => return Err(LayerError::decode(path, "manifest lists no images")),
        entries => {
            return Err(LayerError::decode(
                path,
                format!(
                    "archive must contain a single image, found {}",
                    entries.len()
                ),
            ))
        }
    };

    let config: ImageConfig = read_json(path, &entry.config)?;
    let diff_ids = &config.rootfs.diff_ids;
    if !diff_ids.is_empty() && diff_ids.len() != entry.layers.len() {
        return Err(LayerError::decode(
            path,
            format!(
                "config lists {} diff ids for {} layers",
                diff_ids.len(),
                entry.layers.len()
            ),
        ));
    }

    let layers = entry
        .layers
        .iter()
        .enumerate()
        .map(|(index, tar_path)| {
            Layer::new(index, tar_path.clone(), diff_ids.get(index).cloned(), path)
        })
        .collect();

    debug!(
        archive = %path.display(),
        layers = entry.layers.len(),
        "decoded image archive"
    );

    Ok(Image::new(path.to_path_buf(), entry, config, layers))
}

/// Every repo tag named by any image in the archive
pub fn extract_tags(path: &Path) -> LayerResult<BTreeSet<String>> {
    Ok(read_manifest(path)?
        .into_iter()
        .flat_map(|entry| entry.repo_tags.unwrap_or_default())
        .collect())
}

fn read_manifest(path: &Path) -> LayerResult<Vec<ManifestEntry>> {
    read_json(path, MANIFEST_FILE)
}

fn read_json<T: DeserializeOwned>(path: &Path, entry_name: &str) -> LayerResult<T> {
    let file = File::open(path)
        .map_err(|e| LayerError::io(format!("opening image archive {}", path.display()), e))?;
    let reader = read_one(BufReader::new(file), entry_name)
        .map_err(|e| LayerError::decode(path, e.to_string()))?;
    serde_json::from_reader(reader)
        .map_err(|e| LayerError::decode(path, format!("invalid {}: {}", entry_name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{docker_save_archive, TarFixture};
    use tempfile::TempDir;

    fn write_archive(dir: &TempDir, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join("image.tar");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn decode_reads_manifest_and_config() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(&dir, &docker_save_archive(&["busybox:latest"]));

        let image = decode(&path).unwrap();

        assert_eq!(image.config().architecture, "amd64");
        assert_eq!(image.config().os, "linux");
        assert_eq!(image.layers().len(), 2);
        assert_eq!(image.layers()[0].tar_path(), "base/layer.tar");
        assert_eq!(image.layers()[1].diff_id(), Some("sha256:top"));
        assert_eq!(image.id(), "sha256:0123abcd");
        assert!(image.tags().is_empty());
    }

    #[test]
    fn extract_tags_collects_repo_tags() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(&dir, &docker_save_archive(&["busybox:latest", "busybox:1.36"]));

        let tags = extract_tags(&path).unwrap();
        let expected: BTreeSet<String> = ["busybox:1.36", "busybox:latest"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn missing_manifest_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(&dir, &TarFixture::new().file("other", b"x").build());

        let err = decode(&path).unwrap_err();
        assert!(matches!(err, LayerError::Decode { .. }));
        assert!(err.to_string().contains("manifest.json"));
    }

    #[test]
    fn multiple_images_are_rejected() {
        let manifest = br#"[
            {"Config": "a.json", "RepoTags": null, "Layers": []},
            {"Config": "b.json", "RepoTags": null, "Layers": []}
        ]"#;
        let dir = TempDir::new().unwrap();
        let path = write_archive(&dir, &TarFixture::new().file(MANIFEST_FILE, manifest).build());

        let err = decode(&path).unwrap_err();
        assert!(err.to_string().contains("single image"));
        assert!(extract_tags(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_archive_is_an_io_error() {
        let err = decode(Path::new("/nonexistent/image.tar")).unwrap_err();
        assert!(matches!(err, LayerError::Io { .. }));
    }
}
