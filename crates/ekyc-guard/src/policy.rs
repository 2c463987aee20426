//! Trust policy -- the gate a capture pipeline calls before each step.
//!
//! The policy owns the trust baseline. It is captured on first use and
//! never refreshed implicitly; [`TrustPolicy::rebaseline`] is the only way
//! to replace it.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auditor::CallStackAuditor;
use crate::config::GuardConfig;
use crate::environment::{jailbreak_check, EnvironmentProbe, HostEnvironment};
use crate::error::{FailureKind, Result};
use crate::inventory::{capture_baseline, capture_loaded_modules, ModuleDrift};
use crate::platform::{Platform, SymbolResolver};
use crate::types::{CheckResult, StackAuditResult, SymbolCheckResult, SymbolTarget, TrustBaseline, TrustVerdict};
use crate::verifier::SymbolVerifier;

/// Check name of the module drift sub-result.
pub const MODULE_DRIFT: &str = "module_drift";

/// What a caller wants verified on top of the configured checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRequest {
    /// Entry points to verify, after the configured sensitive symbols
    #[serde(default)]
    pub symbols: Vec<SymbolTarget>,
    /// Audit the calling thread's stack
    #[serde(default)]
    pub audit_call_stack: bool,
}

impl TrustRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_symbol(mut self, target: SymbolTarget) -> Self {
        self.symbols.push(target);
        self
    }

    #[must_use]
    pub fn with_call_stack(mut self) -> Self {
        self.audit_call_stack = true;
        self
    }
}

/// Runs every enabled check and folds them into one verdict.
///
/// Shareable across threads; concurrent first calls capture the baseline
/// exactly once.
pub struct TrustPolicy {
    platform: Platform,
    environment: Arc<dyn EnvironmentProbe>,
    baseline: RwLock<Option<Arc<TrustBaseline>>>,
    capture: Mutex<()>,
}

impl TrustPolicy {
    pub fn new(platform: Platform, environment: Arc<dyn EnvironmentProbe>) -> Self {
        Self {
            platform,
            environment,
            baseline: RwLock::new(None),
            capture: Mutex::new(()),
        }
    }

    /// Native platform and host environment, shaped by `config`.
    pub fn native(symbols: Arc<dyn SymbolResolver>, config: &GuardConfig) -> Self {
        let environment = HostEnvironment::at_root(config.environment_root.clone())
            .with_ld_preload(std::env::var("LD_PRELOAD").ok());
        Self::new(
            Platform::native_with_depth(symbols, config.max_stack_depth),
            Arc::new(environment),
        )
    }

    #[must_use]
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The trust baseline, captured now if this is the first access.
    ///
    /// # Errors
    ///
    /// `GuardError::BaselineUnavailable` if the inventory cannot be read.
    /// A failed capture is not cached; the next call tries again.
    pub fn baseline(&self) -> Result<Arc<TrustBaseline>> {
        if let Some(baseline) = self.current_baseline() {
            return Ok(baseline);
        }

        let _guard = self.capture.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(baseline) = self.current_baseline() {
            return Ok(baseline);
        }

        let captured = Arc::new(capture_baseline(self.platform.images.as_ref())?);
        self.store_baseline(Arc::clone(&captured));
        Ok(captured)
    }

    /// Replace the baseline with the current inventory.
    ///
    /// Gate runs already in flight keep the baseline they started with.
    /// On failure the previous baseline stays in place.
    pub fn rebaseline(&self) -> Result<Arc<TrustBaseline>> {
        let _guard = self.capture.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = Arc::new(capture_baseline(self.platform.images.as_ref())?);
        info!(modules = fresh.modules.len(), "trust baseline replaced");
        self.store_baseline(Arc::clone(&fresh));
        Ok(fresh)
    }

    fn current_baseline(&self) -> Option<Arc<TrustBaseline>> {
        self.baseline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }

    fn store_baseline(&self, baseline: Arc<TrustBaseline>) {
        *self.baseline.write().unwrap_or_else(PoisonError::into_inner) = Some(baseline);
    }

    /// Verify one entry point against the baseline.
    pub fn check_symbol(&self, target: &SymbolTarget) -> SymbolCheckResult {
        match self.baseline() {
            Ok(baseline) => {
                let names = baseline.names();
                SymbolVerifier::from_platform(&self.platform, &names).check_target(target)
            }
            Err(e) => SymbolCheckResult::baseline_unavailable(target, e.to_string()),
        }
    }

    /// Audit the calling thread's stack against the baseline.
    pub fn check_call_stack(&self) -> StackAuditResult {
        match self.baseline() {
            Ok(baseline) => {
                CallStackAuditor::from_platform(&self.platform).check_call_stack(&baseline.names())
            }
            Err(e) => StackAuditResult::error(FailureKind::BaselineUnavailable, e.to_string()),
        }
    }

    /// Run the checks `config` enables plus those `request` asks for.
    ///
    /// Order: virtual camera, simulator, jailbreak, symbols, call stack,
    /// module drift. Disabled checks are absent from the verdict. Nothing
    /// here returns early or panics: every failure, including a missing
    /// baseline, becomes a failing sub-result.
    pub fn evaluate_trust(&self, config: &GuardConfig, request: &TrustRequest) -> TrustVerdict {
        let mut results = Vec::new();

        if config.check_virtual_camera {
            results.push(self.environment.virtual_camera());
        }
        if config.check_simulator {
            results.push(self.environment.simulator());
        }
        if config.check_jailbroken {
            results.push(jailbreak_check(self.platform.images.as_ref(), self.environment.as_ref()));
        }

        let targets = symbol_targets(config, request);
        let needs_baseline = !targets.is_empty() || request.audit_call_stack || config.check_module_drift;

        let mut digest = None;
        if needs_baseline {
            match self.baseline() {
                Ok(baseline) => {
                    digest = Some(baseline.digest());
                    let names = baseline.names();
                    self.baseline_checks(config, request, &targets, &names, &mut results);
                }
                Err(e) => {
                    warn!(error = %e, "baseline unavailable, dependent checks fail");
                    let reason = e.to_string();
                    for target in &targets {
                        results.push(CheckResult::fail(target.check_name(), reason.clone()));
                    }
                    if request.audit_call_stack {
                        results.push(CheckResult::fail("call_stack", reason.clone()));
                    }
                    if config.check_module_drift {
                        results.push(CheckResult::fail(MODULE_DRIFT, reason));
                    }
                }
            }
        }

        let verdict = TrustVerdict::aggregate(results, digest);
        if verdict.overall_success {
            info!(checks = verdict.sub_results.len(), "trust verdict: pass");
        } else {
            warn!(
                checks = verdict.sub_results.len(),
                failed = verdict.failures().count(),
                "trust verdict: fail"
            );
        }
        verdict
    }

    fn baseline_checks(
        &self,
        config: &GuardConfig,
        request: &TrustRequest,
        targets: &[SymbolTarget],
        baseline: &BTreeSet<String>,
        results: &mut Vec<CheckResult>,
    ) {
        let verifier = SymbolVerifier::from_platform(&self.platform, baseline);
        for target in targets {
            let result = verifier.check_target(target);
            debug!(symbol = %target.check_name(), success = result.success, "symbol verified");
            results.push(CheckResult::from_symbol(target, &result));
        }

        if request.audit_call_stack {
            let audit = CallStackAuditor::from_platform(&self.platform).check_call_stack(baseline);
            results.push(CheckResult::from_stack(&audit));
        }

        if config.check_module_drift {
            results.push(self.module_drift(baseline));
        }
    }

    fn module_drift(&self, baseline: &BTreeSet<String>) -> CheckResult {
        match capture_loaded_modules(self.platform.images.as_ref()) {
            Ok(current) => {
                let drift = ModuleDrift::between(baseline, &current);
                if drift.is_suspicious() {
                    let added: Vec<&str> = drift.added.iter().map(String::as_str).collect();
                    CheckResult::fail(
                        MODULE_DRIFT,
                        format!("loaded since baseline: {}", added.join(", ")),
                    )
                } else {
                    CheckResult::pass(MODULE_DRIFT, "no modules loaded since baseline")
                }
            }
            Err(e) => CheckResult::fail(MODULE_DRIFT, format!("cannot enumerate modules: {e}")),
        }
    }
}

impl std::fmt::Debug for TrustPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustPolicy")
            .field("platform", &self.platform)
            .field("baseline", &self.current_baseline().map(|b| b.modules.len()))
            .finish_non_exhaustive()
    }
}

/// Configured targets followed by requested ones, each once.
fn symbol_targets(config: &GuardConfig, request: &TrustRequest) -> Vec<SymbolTarget> {
    let mut targets: Vec<SymbolTarget> = Vec::new();
    for target in config.sensitive_symbols.iter().chain(&request.symbols) {
        if !targets.contains(target) {
            targets.push(target.clone());
        }
    }
    targets
}
