//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use std::process::ExitCode;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// Run the CLI application.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    let config_path = crate::config::resolve_path(cli.config.as_deref())?;

    let ctx = commands::Context {
        config_path,
        output_format: cli.output.unwrap_or(OutputFormat::Pretty),
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Modules(args) => commands::modules::execute(&ctx, &args),
        Commands::Stack => commands::stack::execute(&ctx),
        Commands::Env(args) => commands::env::execute(&ctx, &args),
        Commands::Check(args) => commands::check::execute(&ctx, &args),
        Commands::Config(args) => commands::config::execute(&ctx, args),
    }
}

/// Logs go to stderr; `RUST_LOG` overrides `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
