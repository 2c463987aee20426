//! Trust verdict -- aggregated gate outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stack::StackAuditResult;
use super::symbol::{SymbolCheckResult, SymbolTarget};

/// One named sub-check inside a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Stable check name (`virtual_camera`, `call_stack`, `symbol:-[A b]`, ...)
    pub name: String,
    pub success: bool,
    /// Diagnostic, for logs only
    pub message: String,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            message: message.into(),
        }
    }

    /// Pass when `findings` is empty, otherwise fail listing every finding.
    pub fn from_findings(name: impl Into<String>, clean: &str, findings: &[String]) -> Self {
        if findings.is_empty() {
            Self::pass(name, clean)
        } else {
            Self::fail(name, findings.join("; "))
        }
    }

    #[must_use]
    pub fn from_symbol(target: &SymbolTarget, result: &SymbolCheckResult) -> Self {
        Self {
            name: target.check_name(),
            success: result.success,
            message: result.message.clone(),
        }
    }

    #[must_use]
    pub fn from_stack(result: &StackAuditResult) -> Self {
        Self {
            name: String::from("call_stack"),
            success: result.success,
            message: result.message.clone(),
        }
    }
}

/// Aggregated outcome of one gate invocation.
///
/// Advisory: the caller decides whether to abort the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustVerdict {
    /// AND of every sub-result; vacuously `true` when none ran
    pub overall_success: bool,
    /// Enabled checks only, in evaluation order
    pub sub_results: Vec<CheckResult>,
    pub evaluated_at: DateTime<Utc>,
    /// Digest of the baseline used, when one was needed
    pub baseline_digest: Option<String>,
}

impl TrustVerdict {
    /// Combine sub-results with AND semantics.
    #[must_use]
    pub fn aggregate(sub_results: Vec<CheckResult>, baseline_digest: Option<String>) -> Self {
        Self {
            overall_success: sub_results.iter().all(|r| r.success),
            sub_results,
            evaluated_at: Utc::now(),
            baseline_digest,
        }
    }

    /// Sub-results that failed.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.sub_results.iter().filter(|r| !r.success)
    }

    /// Compact audit-trail line.
    ///
    /// Format: `ok=<0|1>;ts=<epoch>[;baseline=<digest12>];<check>=<pass|fail>...`
    #[must_use]
    pub fn audit_line(&self) -> String {
        let mut line = format!(
            "ok={};ts={}",
            u8::from(self.overall_success),
            self.evaluated_at.timestamp()
        );
        if let Some(digest) = &self.baseline_digest {
            line.push_str(";baseline=");
            line.push_str(&digest[..digest.len().min(12)]);
        }
        for result in &self.sub_results {
            line.push(';');
            line.push_str(&result.name);
            line.push('=');
            line.push_str(if result.success { "pass" } else { "fail" });
        }
        line
    }

    /// Pretty JSON for logs and audit storage.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Failure messages joined for an error field on the transaction.
    #[must_use]
    pub fn failure_summary(&self) -> Option<String> {
        let messages: Vec<String> = self
            .failures()
            .map(|r| format!("{}: {}", r.name, r.message))
            .collect();
        if messages.is_empty() {
            None
        } else {
            Some(messages.join(" | "))
        }
    }
}
