//! `ekyc-guard stack` - audit this process's own call stack.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use ekyc_guard::{DispatchTable, TrustPolicy};

use super::Context;
use crate::output::{mark, print_json, OutputFormat};

pub fn execute(ctx: &Context) -> Result<ExitCode> {
    let config = ctx.config()?;
    let policy = TrustPolicy::native(Arc::new(DispatchTable::new()), &config);

    let audit = policy.check_call_stack();

    match ctx.output_format {
        OutputFormat::Json => print_json(&audit)?,
        OutputFormat::Pretty => {
            println!("{}  {}", mark(audit.success), audit.message);
            if ctx.verbose > 0 {
                for ip in &audit.unattributed_frames {
                    println!("    {}", format!("{ip:#018x}").yellow());
                }
            }
        }
    }
    super::success()
}
