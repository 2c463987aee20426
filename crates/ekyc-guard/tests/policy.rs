mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use common::{FixedEnvironment, Harness, INJECTED_CODE, UNMAPPED};
use ekyc_guard::{DispatchKind, GuardConfig, SymbolTarget, TrustPolicy, TrustRequest};

fn camera() -> SymbolTarget {
    SymbolTarget::new("Camera", "capture_output", false)
}

fn policy(h: &Harness, env: FixedEnvironment) -> TrustPolicy {
    TrustPolicy::new(h.platform(), Arc::new(env))
}

fn all_checks() -> GuardConfig {
    GuardConfig {
        check_virtual_camera: true,
        check_simulator: true,
        check_jailbroken: true,
        check_module_drift: true,
        ..GuardConfig::default()
    }
}

#[test]
fn default_config_with_empty_request_passes_vacuously() {
    let h = Harness::new();
    let verdict = policy(&h, FixedEnvironment::default()).evaluate_trust(&GuardConfig::default(), &TrustRequest::new());
    assert!(verdict.overall_success);
    assert!(verdict.sub_results.is_empty());
}

#[test]
fn disabled_environment_checks_are_omitted() {
    let h = Harness::new();
    let env = FixedEnvironment {
        virtual_camera: true,
        simulator: true,
        jailbroken: true,
    };
    let request = TrustRequest::new().with_symbol(camera());
    let verdict = policy(&h, env).evaluate_trust(&GuardConfig::default(), &request);

    let names: Vec<&str> = verdict.sub_results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["symbol:-[Camera capture_output]"]);
    assert!(verdict.overall_success);
}

#[test]
fn clean_process_passes_every_check() {
    let h = Harness::new();
    let request = TrustRequest::new().with_symbol(camera()).with_call_stack();
    let verdict = policy(&h, FixedEnvironment::default()).evaluate_trust(&all_checks(), &request);

    let names: Vec<&str> = verdict.sub_results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "virtual_camera",
            "simulator",
            "jailbreak",
            "symbol:-[Camera capture_output]",
            "call_stack",
            "module_drift",
        ]
    );
    assert!(verdict.overall_success, "{:?}", verdict.failure_summary());
    assert!(verdict.audit_line().starts_with("ok=1;"));
}

#[test]
fn one_failing_check_fails_the_gate() {
    let h = Harness::new();
    let config = GuardConfig {
        check_virtual_camera: true,
        check_simulator: true,
        ..GuardConfig::default()
    };
    let env = FixedEnvironment {
        simulator: true,
        ..FixedEnvironment::default()
    };
    let request = TrustRequest::new().with_symbol(camera());
    let verdict = policy(&h, env).evaluate_trust(&config, &request);

    let outcomes: Vec<bool> = verdict.sub_results.iter().map(|r| r.success).collect();
    assert_eq!(outcomes, vec![true, false, true]);
    assert!(!verdict.overall_success);
    assert_eq!(
        verdict.failure_summary().as_deref(),
        Some("simulator: cpu reports hypervisor flag")
    );
}

#[test]
fn injected_library_trips_stack_and_drift() {
    let h = Harness::new();
    let policy = policy(&h, FixedEnvironment::default());
    let config = GuardConfig {
        check_module_drift: true,
        ..GuardConfig::default()
    };
    let request = TrustRequest::new().with_call_stack();
    assert!(policy.evaluate_trust(&config, &request).overall_success);

    h.images.load(common::injected());
    h.stack.set(Ok(vec![INJECTED_CODE + 0x10, common::APP_CODE + 0x10]));

    let verdict = policy.evaluate_trust(&config, &request);
    assert!(!verdict.overall_success);
    assert!(verdict.sub_results.iter().all(|r| !r.success));
    assert_eq!(verdict.sub_results[1].message, "loaded since baseline: libinject");
}

#[test]
fn rebaseline_accepts_new_modules() {
    let h = Harness::new();
    let policy = Arc::new(policy(&h, FixedEnvironment::default()));
    let config = GuardConfig {
        check_module_drift: true,
        ..GuardConfig::default()
    };
    let before = policy.baseline().unwrap().digest();

    h.images.load(common::injected());
    assert!(!policy.evaluate_trust(&config, &TrustRequest::new()).overall_success);

    let fresh = policy.rebaseline().unwrap();
    assert_ne!(fresh.digest(), before);
    assert!(policy.evaluate_trust(&config, &TrustRequest::new()).overall_success);
}

#[test]
fn swizzled_sensitive_symbol_from_config() {
    let h = Harness::new();
    h.table
        .exchange_implementation("Camera", "capture_output", DispatchKind::Instance, UNMAPPED)
        .unwrap();
    let config = GuardConfig {
        sensitive_symbols: vec![camera()],
        ..GuardConfig::default()
    };
    let verdict = policy(&h, FixedEnvironment::default()).evaluate_trust(&config, &TrustRequest::new());
    assert!(!verdict.overall_success);
    assert!(verdict.sub_results[0].message.contains("hooked"));
    assert!(verdict.audit_line().ends_with(";symbol:-[Camera capture_output]=fail"));
}

#[test]
fn concurrent_callers_share_one_baseline() {
    let h = Harness::new();
    let policy = Arc::new(policy(&h, FixedEnvironment::default()));
    let request = TrustRequest::new().with_symbol(camera());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let policy = Arc::clone(&policy);
            let request = request.clone();
            thread::spawn(move || policy.evaluate_trust(&GuardConfig::default(), &request))
        })
        .collect();
    let verdicts: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();

    assert!(verdicts.iter().all(|v| v.overall_success));
    let digests: std::collections::BTreeSet<_> = verdicts.iter().map(|v| v.baseline_digest.clone()).collect();
    assert_eq!(digests.len(), 1);

    // One capture for the baseline, one per symbol check for attribution
    assert_eq!(h.images.enumerations.load(Ordering::SeqCst), 1 + 8);
}

#[test]
fn verdict_round_trips_through_json() {
    let h = Harness::new();
    let verdict = policy(&h, FixedEnvironment::default()).evaluate_trust(&all_checks(), &TrustRequest::new());
    let json = serde_json::to_string(&verdict).unwrap();
    let back: ekyc_guard::TrustVerdict = serde_json::from_str(&json).unwrap();
    assert_eq!(back, verdict);
}
