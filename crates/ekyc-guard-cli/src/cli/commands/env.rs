//! `ekyc-guard env` - device and environment probes.

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use ekyc_guard::platform::ProcMapsEnumerator;
use ekyc_guard::{jailbreak_check, EnvironmentProbe, HostEnvironment};

use super::Context;
use crate::cli::args::EnvArgs;
use crate::output::{print_checks, print_json, OutputFormat};

pub fn execute(ctx: &Context, args: &EnvArgs) -> Result<ExitCode> {
    let config = ctx.config()?;
    let env = HostEnvironment::at_root(config.environment_root.clone())
        .with_ld_preload(std::env::var("LD_PRELOAD").ok());

    let mut results = Vec::new();
    if args.all || config.check_virtual_camera {
        results.push(env.virtual_camera());
    }
    if args.all || config.check_simulator {
        results.push(env.simulator());
    }
    if args.all || config.check_jailbroken {
        results.push(jailbreak_check(&ProcMapsEnumerator::default(), &env));
    }

    match ctx.output_format {
        OutputFormat::Json => print_json(&results)?,
        OutputFormat::Pretty => {
            if results.is_empty() {
                println!(
                    "{} enable probes in {} or pass --all",
                    "No probes enabled:".yellow(),
                    ctx.config_path.display()
                );
            } else {
                print_checks(&results);
            }
        }
    }
    super::success()
}
