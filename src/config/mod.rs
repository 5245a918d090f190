//! Configuration loading for layerscope
//!
//! A single TOML file, `layerscope/config.toml` under the platform config
//! directory unless `--config` / `LAYERSCOPE_CONFIG` names another. A
//! missing file means "all defaults"; missing keys fall back per section.

pub mod schema;

pub use schema::Config;

use crate::error::{LayerError, LayerResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Reads and writes the config file at one fixed path
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Use `explicit` when given, else the per-user default location
    pub fn locate(explicit: Option<PathBuf>) -> Self {
        let path = explicit.unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("layerscope")
                .join("config.toml")
        });
        Self { path }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> LayerResult<Config> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(LayerError::io(
                    format!("reading config from {}", self.path.display()),
                    e,
                ))
            }
        };

        toml::from_str(&content).map_err(|e| LayerError::ConfigInvalid {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Write `config`, creating the parent directory if needed
    pub async fn save(&self, config: &Config) -> LayerResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| LayerError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        fs::write(&self.path, toml::to_string_pretty(config)?)
            .await
            .map_err(|e| LayerError::io(format!("writing config to {}", self.path.display()), e))?;

        info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}
