//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{LayerError, LayerResult};
use crate::ui::{self, UiContext};

/// Keys accepted by `config set`
const VALID_KEYS: [&str; 6] = [
    "general.log_format",
    "daemon.command",
    "daemon.throughput_mib_per_sec",
    "daemon.save_timeout_secs",
    "scratch.prefix",
    "scratch.root",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> LayerResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let mut updated = config.clone();
            if let Err(e) = apply_value(&mut updated, &key, &value) {
                let ctx = UiContext::detect();
                ui::remark(&ctx, &format!("Valid keys: {}", VALID_KEYS.join(", ")));
                return Err(e);
            }
            manager.save(&updated).await?;
            ui::step_ok(&UiContext::detect(), &format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> LayerResult<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> LayerResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

/// Set a dot-separated key on `config`
fn apply_value(config: &mut Config, key: &str, value: &str) -> LayerResult<()> {
    match key {
        "general.log_format" => {
            if value != "text" && value != "json" {
                return Err(LayerError::User(format!(
                    "Invalid log format: {}. Use text or json",
                    value
                )));
            }
            config.general.log_format = value.to_string();
        }
        "daemon.command" => config.daemon.command = value.to_string(),
        "daemon.throughput_mib_per_sec" => config.daemon.throughput_mib_per_sec = parse_u64(value)?,
        "daemon.save_timeout_secs" => {
            config.daemon.save_timeout_secs = match value {
                "" | "none" => None,
                _ => Some(parse_u64(value)?),
            }
        }
        "scratch.prefix" => config.scratch.prefix = value.to_string(),
        "scratch.root" => {
            config.scratch.root = match value {
                "" => None,
                _ => Some(value.into()),
            }
        }
        _ => return Err(LayerError::User(format!("Unknown config key: {}", key))),
    }
    Ok(())
}

fn parse_u64(value: &str) -> LayerResult<u64> {
    value
        .parse()
        .map_err(|_| LayerError::User(format!("Invalid number: {}", value)))
}
