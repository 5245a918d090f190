//! Layerscope - look inside container images
//!
//! Acquires images from `docker save` tarballs or a running container
//! daemon, streams per-file metadata out of every layer and fetches file
//! contents straight from the archive.

pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod event;
pub mod file;
pub mod image;
pub mod progress;
pub mod session;
pub mod tracker;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use error::{LayerError, LayerResult};
pub use session::{AcquireOption, Session};
