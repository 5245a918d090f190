//! Selective content extraction from tar streams

use crate::error::{LayerError, LayerResult};
use crate::file::metadata::entry_name;
use crate::file::reference::Reference;
use std::collections::{HashMap, HashSet};
use std::io::{self, Read};
use tar::Archive;
use tracing::debug;

/// Upper bound on the buffer reserved up front for one entry
const PREALLOC_LIMIT: u64 = 1 << 20;

/// Tar entry names (as written in the archive) mapped to the references
/// their contents should be returned under.
pub type TarContentsRequest = HashMap<String, Reference>;

/// Reader over the body of exactly one tar entry.
///
/// Owns the original input; dropping it releases that input on every exit
/// path.
#[derive(Debug)]
pub struct TarEntryReader<R> {
    name: String,
    size: u64,
    inner: io::Take<R>,
}

impl<R> TarEntryReader<R> {
    /// Entry name as written in the archive
    pub fn entry_name(&self) -> &str {
        &self.name
    }

    /// Total size of the entry body in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Give back the original input, positioned wherever reading stopped
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read> Read for TarEntryReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Find `tar_path` in the archive and return a reader over its body.
///
/// Entries before the match are skipped without being buffered.
pub fn read_one<R: Read>(reader: R, tar_path: &str) -> LayerResult<TarEntryReader<R>> {
    let mut archive = Archive::new(reader);

    let mut size = None;
    for entry in archive
        .entries()
        .map_err(|e| LayerError::io("reading tar archive", e))?
    {
        let entry = entry.map_err(|e| LayerError::io("reading next tar header", e))?;
        if entry_name(&entry) == tar_path {
            size = Some(entry.size());
            break;
        }
    }

    let size = size.ok_or_else(|| LayerError::NotFound(tar_path.to_string()))?;

    // The walk stops right after the matching header, so the input is
    // positioned at the first byte of the entry body.
    let inner = archive.into_inner().take(size);
    debug!(entry = tar_path, size, "found tar entry");

    Ok(TarEntryReader {
        name: tar_path.to_string(),
        size,
        inner,
    })
}

/// Read the full contents of every requested entry in one pass.
///
/// Fails with [`LayerError::PartialBatchMiss`] naming every requested entry
/// that is absent from the archive; no partial result is returned.
pub fn read_many<R: Read>(
    reader: R,
    request: &TarContentsRequest,
) -> LayerResult<HashMap<Reference, Vec<u8>>> {
    let mut archive = Archive::new(reader);
    let mut results = HashMap::with_capacity(request.len());
    let mut found: HashSet<String> = HashSet::with_capacity(request.len());

    for entry in archive
        .entries()
        .map_err(|e| LayerError::io("reading tar archive", e))?
    {
        let mut entry = entry.map_err(|e| LayerError::io("reading next tar header", e))?;
        let name = entry_name(&entry);

        if let Some(reference) = request.get(&name) {
            // the declared size is untrusted; read_to_end grows as needed
            let hint = entry.size().min(PREALLOC_LIMIT) as usize;
            let mut contents = Vec::with_capacity(hint);
            entry
                .read_to_end(&mut contents)
                .map_err(|e| LayerError::io(format!("could not read file: {}", name), e))?;
            results.insert(reference.clone(), contents);
            found.insert(name);
        }
    }

    if found.len() != request.len() {
        let mut missing: Vec<String> = request
            .keys()
            .filter(|name| !found.contains(*name))
            .cloned()
            .collect();
        missing.sort();
        return Err(LayerError::PartialBatchMiss { missing });
    }

    Ok(results)
}
