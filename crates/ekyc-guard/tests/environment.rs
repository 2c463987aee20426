mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::Harness;
use ekyc_guard::{GuardConfig, HostEnvironment, TrustPolicy, TrustRequest};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn env_checks() -> GuardConfig {
    GuardConfig {
        check_virtual_camera: true,
        check_simulator: true,
        check_jailbroken: true,
        ..GuardConfig::default()
    }
}

#[test]
fn clean_device_tree_passes() {
    let root = TempDir::new().unwrap();
    write(root.path(), "sys/class/video4linux/video0/name", "Integrated Camera\n");
    write(root.path(), "sys/class/dmi/id/sys_vendor", "Dell Inc.\n");

    let h = Harness::new();
    let policy = TrustPolicy::new(h.platform(), Arc::new(HostEnvironment::at_root(root.path())));
    let verdict = policy.evaluate_trust(&env_checks(), &TrustRequest::new());
    assert!(verdict.overall_success, "{:?}", verdict.failure_summary());
    assert_eq!(verdict.sub_results.len(), 3);
}

#[test]
fn compromised_device_tree_fails_each_probe() {
    let root = TempDir::new().unwrap();
    write(root.path(), "sys/class/video4linux/video4/name", "Dummy video device (0x0000)\n");
    write(root.path(), "sys/class/dmi/id/product_name", "KVM\n");
    write(root.path(), "data/local/tmp/frida-server", "");

    let h = Harness::new();
    let policy = TrustPolicy::new(h.platform(), Arc::new(HostEnvironment::at_root(root.path())));
    let verdict = policy.evaluate_trust(&env_checks(), &TrustRequest::new());

    assert!(!verdict.overall_success);
    assert_eq!(verdict.failures().count(), 3);
    let line = verdict.audit_line();
    assert!(line.ends_with(";virtual_camera=fail;simulator=fail;jailbreak=fail"), "{line}");
}

#[test]
fn instrumentation_module_in_process_is_jailbreak_signal() {
    let root = TempDir::new().unwrap();
    let h = Harness::new();
    h.images.load(common::image("frida-agent-64", "/tmp/frida-agent-64.so", 0x70_000));

    let policy = TrustPolicy::new(h.platform(), Arc::new(HostEnvironment::at_root(root.path())));
    let config = GuardConfig {
        check_jailbroken: true,
        ..GuardConfig::default()
    };
    let verdict = policy.evaluate_trust(&config, &TrustRequest::new());
    assert!(!verdict.overall_success);
    assert!(verdict.sub_results[0].message.contains("frida-agent-64"));
}
