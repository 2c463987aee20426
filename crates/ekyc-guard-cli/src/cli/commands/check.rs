//! `ekyc-guard check` - the full trust gate over this process.
//!
//! The CLI stands in for a capture pipeline: it registers its own command
//! entry points as sensitive symbols, then asks the gate whether they,
//! its call stack and the device are still trustworthy.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use ekyc_guard::{DispatchKind, DispatchTable, GuardConfig, TrustPolicy, TrustRequest};
use tracing::debug;

use super::{Context, EXIT_UNTRUSTED};
use crate::cli::args::CheckArgs;
use crate::output::{print_verdict, OutputFormat};

/// Register the CLI's command handlers.
fn register_entry_points(table: &DispatchTable) -> Result<()> {
    let entries: [(&str, &str, usize); 6] = [
        ("Cli", "run", crate::cli::run as usize),
        ("Commands", "check", execute as usize),
        ("Commands", "stack", super::stack::execute as usize),
        ("Commands", "modules", super::modules::execute as usize),
        ("Commands", "env", super::env::execute as usize),
        ("Commands", "config", super::config::execute as usize),
    ];
    for (class_name, selector, address) in entries {
        table.register(class_name, selector, DispatchKind::Class, address)?;
    }
    debug!(count = table.len(), "entry points registered");
    Ok(())
}

pub fn execute(ctx: &Context, args: &CheckArgs) -> Result<ExitCode> {
    let loaded = ctx.config()?;

    let table = DispatchTable::with_reader(
        Arc::new(ekyc_guard::platform::ProcMemReader::default()),
        loaded.prologue_bytes,
    );
    register_entry_points(&table)?;
    let targets = table.targets();
    let policy = TrustPolicy::native(Arc::new(table), &loaded);

    let (config, request) = if args.symbols_only {
        let config = GuardConfig {
            check_virtual_camera: false,
            check_simulator: false,
            check_jailbroken: false,
            check_module_drift: false,
            ..loaded
        };
        let request = TrustRequest {
            symbols: targets,
            audit_call_stack: false,
        };
        (config, request)
    } else {
        let request = TrustRequest {
            symbols: targets,
            audit_call_stack: true,
        };
        (loaded, request)
    };

    let verdict = policy.evaluate_trust(&config, &request);

    match ctx.output_format {
        OutputFormat::Json => println!("{}", verdict.to_json()?),
        OutputFormat::Pretty => print_verdict(&verdict),
    }

    if verdict.overall_success {
        super::success()
    } else {
        Ok(ExitCode::from(EXIT_UNTRUSTED))
    }
}
