//! Configuration resolution for the tokkyo binary.
//! Reads the path given by `--config`, else `TOKKYO_CONFIG`, else tokkyo.toml
//! in the current directory. A missing file means built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokkyo_common::{LegacyDatasetLimits, PipelineConfig};
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "TOKKYO_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "tokkyo.toml";

/// Where the config comes from, and whether the user asked for it explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub explicit: bool,
}

pub fn resolve_path(flag: Option<&Path>, env: Option<String>) -> ConfigSource {
    match (flag, env.filter(|v| !v.trim().is_empty())) {
        (Some(path), _) => ConfigSource { path: path.to_path_buf(), explicit: true },
        (None, Some(var)) => ConfigSource { path: PathBuf::from(var), explicit: true },
        (None, None) => ConfigSource { path: PathBuf::from(DEFAULT_CONFIG_FILE), explicit: false },
    }
}

pub fn load(flag: Option<&Path>, legacy: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let source = resolve_path(flag, std::env::var(CONFIG_ENV).ok());

    let config = if source.path.exists() {
        PipelineConfig::load(&source.path)
            .with_context(|| format!("Failed to load config {}", source.path.display()))?
    } else {
        if source.explicit {
            warn!(path = %source.path.display(), "Config file not found, using defaults");
        } else {
            info!("No {DEFAULT_CONFIG_FILE} found, using defaults");
        }
        PipelineConfig::default()
    };

    match legacy {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read legacy limits {}", path.display()))?;
            let limits = LegacyDatasetLimits::from_json_str(&content)?;
            Ok(config.with_legacy_limits(&limits)?)
        }
        None => Ok(config),
    }
}
