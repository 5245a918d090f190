//! Configuration schema for layerscope
//!
//! Configuration is stored at `~/.config/layerscope/config.toml`

use crate::image::SaveSettings;
use crate::tracker::DEFAULT_SCRATCH_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Container daemon settings
    pub daemon: DaemonConfig,

    /// Scratch directory settings
    pub scratch: ScratchConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Container daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// CLI used to reach the daemon ("docker" or "podman")
    pub command: String,

    /// Assumed `save` throughput in MiB/s, used for progress estimates
    pub throughput_mib_per_sec: u64,

    /// Abort a save that runs longer than this many seconds
    pub save_timeout_secs: Option<u64>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            command: "docker".to_string(),
            throughput_mib_per_sec: 150,
            save_timeout_secs: None,
        }
    }
}

impl DaemonConfig {
    pub fn save_settings(&self) -> SaveSettings {
        SaveSettings {
            throughput_bytes_per_sec: self
                .throughput_mib_per_sec
                .max(1)
                .saturating_mul(1024 * 1024),
            timeout: self.save_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Scratch directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// Name prefix for scratch directories
    pub prefix: String,

    /// Directory to create scratch directories in (default: system temp dir)
    pub root: Option<PathBuf>,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_SCRATCH_PREFIX.to_string(),
            root: None,
        }
    }
}

impl ScratchConfig {
    pub fn root_or_temp(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(std::env::temp_dir)
    }
}
