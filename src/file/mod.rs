//! File identities, tar metadata scanning and content retrieval
//!
//! Everything here works on plain `std::io::Read` tar streams and makes a
//! single forward pass over the archive.

mod fetch;
mod metadata;
mod reference;
mod scan;

pub use fetch::{read_many, read_one, TarContentsRequest, TarEntryReader};
pub use metadata::{clean_path, FileType, Metadata, DIR_SEPARATOR};
pub use reference::{FileId, Reference, ReferenceRegistry};
pub use scan::{scan, MetadataStream};
