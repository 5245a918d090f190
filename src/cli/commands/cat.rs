//! Cat command - print one file from one layer

use crate::cli::args::CatArgs;
use crate::cli::commands::with_image;
use crate::config::Config;
use crate::error::{LayerError, LayerResult};
use crate::file::{clean_path, FileType};
use crate::image::Image;
use crate::session::AcquireOption;
use std::io::{self, Write};

/// Execute the cat command
pub async fn execute(args: CatArgs, config: &Config) -> LayerResult<()> {
    with_image(config, &args.image, AcquireOption::Read, |image| {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        copy_file(image, args.layer, &args.path, &mut out)?;
        out.flush()
            .map_err(|e| LayerError::io("writing to stdout", e))
    })
    .await
}

/// Copy the contents of `path` in layer `index` into `out`
fn copy_file(image: &Image, index: usize, path: &str, out: &mut impl Write) -> LayerResult<u64> {
    let layer = image.layer(index).ok_or_else(|| {
        LayerError::User(format!(
            "Layer {} does not exist (image has {} layers)",
            index,
            image.layers().len()
        ))
    })?;

    let cleaned = clean_path(path);
    let record = layer
        .file(&cleaned)
        .ok_or_else(|| LayerError::NotFound(cleaned.clone()))?;

    match record.metadata.file_type {
        FileType::Directory => {
            return Err(LayerError::User(format!("{} is a directory", cleaned)))
        }
        FileType::Symlink | FileType::Hardlink => {
            return Err(LayerError::User(format!(
                "{} is a link to {}",
                cleaned, record.metadata.link_target
            )))
        }
        _ => {}
    }

    let mut reader = layer.open_file(&record.metadata.tar_entry_name)?;
    io::copy(&mut reader, out).map_err(|e| LayerError::io(format!("reading {}", cleaned), e))
}
