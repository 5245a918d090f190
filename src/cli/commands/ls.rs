//! Ls command - list the files in each layer of an image

use crate::cli::args::{LsArgs, OutputFormat};
use crate::cli::commands::with_image;
use crate::config::Config;
use crate::error::{LayerError, LayerResult};
use crate::file::{FileType, Metadata};
use crate::image::{FileRecord, Image, Layer};
use crate::session::AcquireOption;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// One layer as printed by `ls --format json`
#[derive(Serialize)]
struct LayerListing<'a> {
    index: usize,
    tar_path: &'a str,
    diff_id: Option<&'a str>,
    files: &'a [FileRecord],
}

/// Execute the ls command
pub async fn execute(args: LsArgs, config: &Config) -> LayerResult<()> {
    with_image(config, &args.image, AcquireOption::Read, |image| {
        let layers = selected_layers(image, args.layer)?;
        match args.format {
            OutputFormat::Table => print_table(&args.image, image, &layers),
            OutputFormat::Json => print_json(&layers)?,
            OutputFormat::Plain => print_plain(&layers),
        }
        Ok(())
    })
    .await
}

fn selected_layers(image: &Image, only: Option<usize>) -> LayerResult<Vec<&Layer>> {
    match only {
        None => Ok(image.layers().iter().collect()),
        Some(index) => image.layer(index).map(|layer| vec![layer]).ok_or_else(|| {
            LayerError::User(format!(
                "Layer {} does not exist (image has {} layers)",
                index,
                image.layers().len()
            ))
        }),
    }
}

fn print_table(name: &str, image: &Image, layers: &[&Layer]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("{} {}", name, style(image.id()).dim()));

    let mut total = 0;
    for layer in layers {
        let title = match layer.diff_id() {
            Some(diff_id) => format!("Layer {} {}", layer.index(), style(diff_id).dim()),
            None => format!("Layer {}", layer.index()),
        };
        ui::section(&ctx, &title);

        println!(
            "{:<10} {:>11} {:>10}  {}",
            style("MODE").bold(),
            style("UID:GID").bold(),
            style("SIZE").bold(),
            style("PATH").bold()
        );
        for record in layer.files() {
            let meta = &record.metadata;
            println!(
                "{:<10} {:>11} {:>10}  {}",
                mode_string(meta),
                format!("{}:{}", meta.user_id, meta.group_id),
                meta.size,
                display_path(meta)
            );
        }
        total += layer.files().len();
    }

    println!();
    println!("{} file(s) in {} layer(s)", total, layers.len());
}

fn print_json(layers: &[&Layer]) -> LayerResult<()> {
    let listings: Vec<LayerListing<'_>> = layers
        .iter()
        .map(|layer| LayerListing {
            index: layer.index(),
            tar_path: layer.tar_path(),
            diff_id: layer.diff_id(),
            files: layer.files(),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&listings)?);
    Ok(())
}

fn print_plain(layers: &[&Layer]) {
    for layer in layers {
        for record in layer.files() {
            println!("{}\t{}", layer.index(), record.metadata.path);
        }
    }
}

fn display_path(meta: &Metadata) -> String {
    match meta.file_type {
        FileType::Symlink => format!("{} -> {}", meta.path, meta.link_target),
        FileType::Hardlink => format!("{} link to {}", meta.path, meta.link_target),
        _ => meta.path.clone(),
    }
}

/// `ls -l` style rendering of a file's type and permission bits
fn mode_string(meta: &Metadata) -> String {
    let kind = match meta.file_type {
        FileType::Regular => '-',
        FileType::Directory => 'd',
        FileType::Symlink => 'l',
        FileType::Hardlink => 'h',
        FileType::Other(_) => '?',
    };

    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6, 3, 0] {
        let bits = (meta.mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}
