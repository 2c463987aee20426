//! Command implementations.

pub mod check;
pub mod config;
pub mod env;
pub mod modules;
pub mod stack;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use ekyc_guard::GuardConfig;

use crate::output::OutputFormat;

/// Exit status of a `check` whose verdict failed.
pub const EXIT_UNTRUSTED: u8 = 2;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Config file in effect (may not exist)
    pub config_path: PathBuf,

    /// Output format
    pub output_format: OutputFormat,

    /// Verbosity level
    pub verbose: u8,
}

impl Context {
    /// Load the gate configuration.
    pub fn config(&self) -> Result<GuardConfig> {
        crate::config::load(&self.config_path)
    }
}

pub(crate) fn success() -> Result<ExitCode> {
    Ok(ExitCode::SUCCESS)
}
