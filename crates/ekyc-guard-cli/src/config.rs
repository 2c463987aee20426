//! Configuration file location and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use ekyc_guard::GuardConfig;

/// Default config file path (`<config dir>/ekyc-guard/guard.toml`).
pub fn default_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("io", "ekyc", "ekyc-guard")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(dirs.config_dir().join("guard.toml"))
}

/// The explicit path if given, the default path otherwise.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_path(),
    }
}

/// Load the gate configuration, falling back to defaults when absent.
pub fn load(path: &Path) -> Result<GuardConfig> {
    GuardConfig::load(path).with_context(|| format!("loading config from {}", path.display()))
}
