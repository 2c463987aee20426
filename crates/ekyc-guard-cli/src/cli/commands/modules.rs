//! `ekyc-guard modules` - loaded module inventory.

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use ekyc_guard::platform::ProcMapsEnumerator;
use ekyc_guard::{capture_loaded_modules, capture_module_records, ModuleRecord};
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::args::ModulesArgs;
use crate::output::{print_json, OutputFormat};

#[derive(Tabled)]
struct ModuleRow {
    #[tabled(rename = "Module")]
    name: String,
    #[tabled(rename = "Base")]
    base: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Path")]
    path: String,
}

impl From<&ModuleRecord> for ModuleRow {
    fn from(record: &ModuleRecord) -> Self {
        let (base, size) = record.load_address_range;
        Self {
            name: record.name.clone(),
            base: format!("{base:#x}"),
            size: format!("{size:#x}"),
            path: record.path.clone(),
        }
    }
}

pub fn execute(ctx: &Context, args: &ModulesArgs) -> Result<ExitCode> {
    let images = ProcMapsEnumerator::default();

    if args.records {
        let records = capture_module_records(&images)?;
        match ctx.output_format {
            OutputFormat::Json => print_json(&records)?,
            OutputFormat::Pretty => {
                let rows: Vec<ModuleRow> = records.iter().map(ModuleRow::from).collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }
        return super::success();
    }

    let names = capture_loaded_modules(&images)?;
    match ctx.output_format {
        OutputFormat::Json => print_json(&names)?,
        OutputFormat::Pretty => {
            println!("{} {}", "Loaded modules:".bold(), names.len().to_string().cyan());
            for name in &names {
                println!("  {name}");
            }
        }
    }
    super::success()
}
