//! Gate configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dispatch::DEFAULT_PROLOGUE_BYTES;
use crate::error::{GuardError, Result};
use crate::platform::DEFAULT_MAX_DEPTH;
use crate::types::SymbolTarget;

/// Which checks the gate runs, and with what limits.
///
/// Environment toggles default to off, so an empty file enables nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Probe for virtual camera devices.
    #[serde(default)]
    pub check_virtual_camera: bool,

    /// Probe for simulators, emulators and hypervisors.
    #[serde(default)]
    pub check_simulator: bool,

    /// Probe for root, jailbreak and instrumentation toolkits.
    #[serde(default)]
    pub check_jailbroken: bool,

    /// Report modules loaded after the baseline was captured.
    #[serde(default)]
    pub check_module_drift: bool,

    /// Filesystem root the environment probes read from.
    #[serde(default = "default_environment_root")]
    pub environment_root: PathBuf,

    /// Prologue bytes fingerprinted at registration (0 disables).
    #[serde(default = "default_prologue_bytes")]
    pub prologue_bytes: usize,

    /// Deepest stack the auditor will walk.
    #[serde(default = "default_max_stack_depth")]
    pub max_stack_depth: usize,

    /// Entry points verified on every gate run.
    #[serde(default)]
    pub sensitive_symbols: Vec<SymbolTarget>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            check_virtual_camera: false,
            check_simulator: false,
            check_jailbroken: false,
            check_module_drift: false,
            environment_root: default_environment_root(),
            prologue_bytes: default_prologue_bytes(),
            max_stack_depth: default_max_stack_depth(),
            sensitive_symbols: Vec::new(),
        }
    }
}

impl GuardConfig {
    /// Load config from a TOML file, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Unreadable files, malformed TOML and invalid values are errors; a
    /// missing file is not.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| GuardError::io(&path.display().to_string(), e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| GuardError::Toml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GuardError::Toml(e.to_string()))
    }

    /// Write as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GuardError::io(&parent.display().to_string(), e))?;
        }
        std::fs::write(path, self.to_toml()?)
            .map_err(|e| GuardError::io(&path.display().to_string(), e))
    }

    /// Reject values no check can run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_stack_depth == 0 {
            return Err(GuardError::Config("max_stack_depth must be at least 1".into()));
        }
        for target in &self.sensitive_symbols {
            if target.class_name.trim().is_empty() || target.selector.trim().is_empty() {
                return Err(GuardError::Config(format!(
                    "sensitive symbol needs a class and selector, got {}",
                    target.check_name()
                )));
            }
        }
        Ok(())
    }

    /// True if any environment probe is on.
    #[must_use]
    pub const fn any_environment_check(&self) -> bool {
        self.check_virtual_camera || self.check_simulator || self.check_jailbroken
    }
}

// Default value functions for serde.
fn default_environment_root() -> PathBuf {
    PathBuf::from("/")
}

const fn default_prologue_bytes() -> usize {
    DEFAULT_PROLOGUE_BYTES
}

const fn default_max_stack_depth() -> usize {
    DEFAULT_MAX_DEPTH
}
