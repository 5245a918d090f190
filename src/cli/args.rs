//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Layerscope - look inside container images
///
/// Acquires an image from a `docker save` tarball or a running container
/// daemon and indexes the files in each of its layers.
#[derive(Parser, Debug)]
#[command(name = "layerscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LAYERSCOPE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the files in every layer of an image
    Ls(LsArgs),

    /// Show the tags recorded in an image
    Tags(TagsArgs),

    /// Print one file from one layer
    Cat(CatArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the ls command
#[derive(Parser, Debug)]
pub struct LsArgs {
    /// Image to inspect (e.g. busybox:latest, docker:alpine, tarball:./image.tar)
    pub image: String,

    /// Only list files from this layer (0 is the base layer)
    #[arg(short, long)]
    pub layer: Option<usize>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the tags command
#[derive(Parser, Debug)]
pub struct TagsArgs {
    /// Image to inspect
    pub image: String,
}

/// Arguments for the cat command
#[derive(Parser, Debug)]
pub struct CatArgs {
    /// Image to read from
    pub image: String,

    /// Layer index (0 is the base layer)
    pub layer: usize,

    /// Absolute path of the file inside the layer
    pub path: String,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., daemon.command)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for the ls command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one path per line)
    Plain,
}
