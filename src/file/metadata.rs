//! Per-entry structural metadata read from tar headers

use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use tar::{Entry, EntryType};

/// Separator used for every cleaned path
pub const DIR_SEPARATOR: &str = "/";

/// Kind of a tar entry, as far as a filesystem view cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "flag")]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    Hardlink,
    /// Devices, fifos and anything else; carries the raw type flag
    Other(u8),
}

impl FileType {
    pub fn from_entry_type(entry_type: EntryType) -> Self {
        match entry_type {
            EntryType::Regular | EntryType::Continuous => FileType::Regular,
            EntryType::Directory => FileType::Directory,
            EntryType::Symlink => FileType::Symlink,
            EntryType::Link => FileType::Hardlink,
            other => FileType::Other(other.as_byte()),
        }
    }

    /// Short label used in listings
    pub fn label(&self) -> &'static str {
        match self {
            FileType::Regular => "file",
            FileType::Directory => "dir",
            FileType::Symlink => "symlink",
            FileType::Hardlink => "hardlink",
            FileType::Other(_) => "other",
        }
    }
}

/// Everything a single tar header says about one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Cleaned absolute path
    pub path: String,
    /// Entry name exactly as written in the archive
    pub tar_entry_name: String,
    pub file_type: FileType,
    /// Empty unless the entry is a symlink or hardlink
    pub link_target: String,
    pub size: u64,
    pub mode: u32,
    pub user_id: u64,
    pub group_id: u64,
    pub is_dir: bool,
}

impl Metadata {
    /// Build a record from the current entry of a tar walk.
    ///
    /// `path` must already be cleaned with [`clean_path`].
    pub(crate) fn from_entry<R: Read>(entry: &Entry<'_, R>, path: String) -> io::Result<Self> {
        let header = entry.header();
        let entry_type = header.entry_type();
        let file_type = FileType::from_entry_type(entry_type);

        let link_target = match file_type {
            FileType::Symlink | FileType::Hardlink => entry
                .link_name()?
                .map(|link| link.to_string_lossy().into_owned())
                .unwrap_or_default(),
            _ => String::new(),
        };

        Ok(Self {
            path,
            tar_entry_name: entry_name(entry),
            file_type,
            link_target,
            size: entry.size(),
            mode: lenient_numeric(&header.as_old().mode, || header.mode())?,
            user_id: lenient_numeric(&header.as_old().uid, || header.uid())?,
            group_id: lenient_numeric(&header.as_old().gid, || header.gid())?,
            is_dir: entry_type.is_dir(),
        })
    }
}

/// Read a numeric header field, treating a blank field (all NUL or space)
/// as zero. Several writers leave uid, gid or mode unset.
fn lenient_numeric<T: Default>(
    raw: &[u8],
    parse: impl FnOnce() -> io::Result<T>,
) -> io::Result<T> {
    if raw.iter().all(|b| *b == 0 || *b == b' ') {
        return Ok(T::default());
    }
    parse()
}

/// Entry name as written in the archive, long-name extensions applied
pub(crate) fn entry_name<R: Read>(entry: &Entry<'_, R>) -> String {
    String::from_utf8_lossy(&entry.path_bytes()).into_owned()
}

/// Lexically clean a tar entry name into an absolute path.
///
/// The name is rooted at `/`, then `.` components and repeated separators
/// are dropped and `..` removes the preceding component. `..` never climbs
/// above the root.
pub fn clean_path(name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in name.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }

    if parts.is_empty() {
        return DIR_SEPARATOR.to_string();
    }

    let mut cleaned = String::with_capacity(name.len() + 1);
    for part in parts {
        cleaned.push_str(DIR_SEPARATOR);
        cleaned.push_str(part);
    }
    cleaned
}
