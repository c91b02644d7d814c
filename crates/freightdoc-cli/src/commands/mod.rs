//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod inspect;
pub mod process;

use std::path::Path;

use anyhow::Context;
use freightdoc_core::FreightConfig;

/// Load the config given with `--config`, else the user config file, else defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<FreightConfig> {
    if let Some(path) = path {
        return FreightConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to read config file {}", path));
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        FreightConfig::from_file(&default_path)
            .with_context(|| format!("Failed to read config file {}", default_path.display()))
    } else {
        Ok(FreightConfig::default())
    }
}

/// Lowercased file extension, empty when absent.
pub fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}
