//! ekyc-guard - runtime integrity gate from the command line.

use std::process::ExitCode;

use anyhow::Result;

fn main() -> Result<ExitCode> {
    ekyc_guard_cli::run()
}
