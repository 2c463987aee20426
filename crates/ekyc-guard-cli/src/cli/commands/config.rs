//! `ekyc-guard config` - configuration file management.

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use ekyc_guard::GuardConfig;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::output::{print_json, OutputFormat};

pub fn execute(ctx: &Context, args: ConfigArgs) -> Result<ExitCode> {
    match args.command {
        ConfigCommands::Show => show_config(ctx)?,
        ConfigCommands::Path => println!("{}", ctx.config_path.display()),
        ConfigCommands::Init { force } => init_config(ctx, force)?,
    }
    super::success()
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = ctx.config()?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&config)?,
        OutputFormat::Pretty => {
            let source = if ctx.config_path.exists() {
                ctx.config_path.display().to_string()
            } else {
                format!("{} (not found, defaults)", ctx.config_path.display())
            };
            println!("{} {}", "# Source:".dimmed(), source.dimmed());
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}

fn init_config(ctx: &Context, force: bool) -> Result<()> {
    if ctx.config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {}\n\
             Pass --force to overwrite it.",
            ctx.config_path.display()
        );
    }
    GuardConfig::default().save(&ctx.config_path)?;
    println!(
        "{} wrote {}",
        "Success:".green().bold(),
        ctx.config_path.display().to_string().cyan()
    );
    Ok(())
}
