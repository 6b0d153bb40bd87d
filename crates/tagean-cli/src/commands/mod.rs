//! Subcommands.

pub mod config;
pub mod extract;
pub mod infer;
pub mod inspect;

use std::path::{Path, PathBuf};

use tracing::debug;

use tagean_core::TagConfig;

/// Per-user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tagean")
        .join("config.json")
}

/// Load configuration: defaults, then the config file, then the environment.
///
/// An explicit `--config` path must exist; the per-user file is optional.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<TagConfig> {
    let mut config = match config_path {
        Some(path) => TagConfig::from_file(Path::new(path))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Using config file {}", path.display());
                TagConfig::from_file(&path)?
            } else {
                TagConfig::default()
            }
        }
    };

    config.apply_env()?;
    Ok(config)
}
