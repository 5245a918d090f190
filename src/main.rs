//! Layerscope - look inside container images
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use layerscope::cli::{Cli, Commands};
use layerscope::config::ConfigManager;
use layerscope::error::LayerResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> LayerResult<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::locate(cli.config.clone());
    let config = config_manager.load().await?;

    // 0 = warn (progress only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("layerscope=warn"),
        1 => EnvFilter::new("layerscope=info"),
        _ => EnvFilter::new("layerscope=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    layerscope::ui::init_theme();

    match cli.command {
        Commands::Ls(args) => layerscope::cli::commands::ls(args, &config).await,
        Commands::Tags(args) => layerscope::cli::commands::tags(args, &config).await,
        Commands::Cat(args) => layerscope::cli::commands::cat(args, &config).await,
        Commands::Config(args) => {
            layerscope::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
