//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Runtime integrity gate for eKYC capture pipelines
///
/// Inspects this process for hooked entry points, foreign code on the call
/// stack and a compromised device environment.
#[derive(Parser, Debug)]
#[command(name = "ekyc-guard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: platform config dir, guard.toml)
    #[arg(short, long, env = "EKYC_GUARD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List executable modules loaded into this process
    Modules(ModulesArgs),

    /// Audit this process's call stack against a fresh baseline
    Stack,

    /// Run device and environment probes
    Env(EnvArgs),

    /// Run the full trust gate (exit status 2 when it fails)
    Check(CheckArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct ModulesArgs {
    /// Show paths and load ranges instead of names only
    #[arg(long)]
    pub records: bool,
}

#[derive(Args, Debug)]
pub struct EnvArgs {
    /// Run every probe, ignoring the config toggles
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Verify registered symbols only; skip environment, stack and drift
    #[arg(long)]
    pub symbols_only: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
