//! Output formatting.

use clap::ValueEnum;
use colored::Colorize;
use ekyc_guard::{CheckResult, TrustVerdict};
use serde::{Deserialize, Serialize};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Pass/fail marker.
pub fn mark(success: bool) -> colored::ColoredString {
    if success {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    }
}

/// One line per check: marker, name, message.
pub fn print_checks(results: &[CheckResult]) {
    let width = results.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for result in results {
        println!(
            "  {}  {:<width$}  {}",
            mark(result.success),
            result.name.bold(),
            result.message.dimmed()
        );
    }
}

pub fn print_verdict(verdict: &TrustVerdict) {
    if verdict.sub_results.is_empty() {
        println!("{}", "No checks enabled.".dimmed());
    } else {
        print_checks(&verdict.sub_results);
    }
    println!();
    let overall = if verdict.overall_success {
        "TRUSTED".green().bold()
    } else {
        "NOT TRUSTED".red().bold()
    };
    println!("{} {}", "Verdict:".bold(), overall);
    if let Some(digest) = &verdict.baseline_digest {
        println!("{} {}", "Baseline:".bold(), digest[..digest.len().min(16)].cyan());
    }
    println!("{} {}", "Audit:".bold(), verdict.audit_line().dimmed());
}
