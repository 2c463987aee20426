//! Root, jailbreak and instrumentation detection.

use std::collections::BTreeSet;
use std::path::Path;

use procfs::prelude::*;
use procfs::process::Status;
use tracing::debug;

use super::existing;

/// `su` binaries.
const SU_PATHS: &[&str] = &[
    "system/bin/su",
    "system/xbin/su",
    "sbin/su",
    "system/su",
    "su/bin/su",
    "data/local/su",
    "data/local/bin/su",
    "data/local/xbin/su",
    "system/bin/failsafe/su",
];

/// Magisk artifacts.
const MAGISK_PATHS: &[&str] = &[
    "data/adb/magisk",
    "sbin/.magisk",
    "cache/.disable_magisk",
    "dev/.magisk.unblock",
];

/// Hook frameworks (Xposed family, Substrate, iOS tweak loaders).
const HOOK_FRAMEWORK_PATHS: &[&str] = &[
    "system/framework/XposedBridge.jar",
    "system/lib/libxposed_art.so",
    "system/lib64/libxposed_art.so",
    "data/adb/modules/edxposed",
    "data/adb/modules/lsposed",
    "data/adb/modules/riru_lsposed",
    "system/lib/libsubstrate.so",
    "system/lib64/libsubstrate.so",
    "Library/MobileSubstrate/MobileSubstrate.dylib",
    "Library/MobileSubstrate/DynamicLibraries",
    "Applications/Cydia.app",
    "Applications/Sileo.app",
    "var/lib/cydia",
    "private/var/stash",
];

/// Frida server binaries.
const FRIDA_PATHS: &[&str] = &[
    "data/local/tmp/frida-server",
    "data/local/tmp/re.frida.server",
    "system/bin/frida-server",
    "system/xbin/frida-server",
    "usr/local/bin/frida-server",
];

/// Lowercase fragments of instrumentation toolkit module names.
const INSTRUMENTATION_MODULES: &[&str] = &[
    "frida",
    "gadget",
    "substrate",
    "substitute",
    "xposed",
    "cycript",
    "libhooker",
    "tweakinject",
];

/// Findings for a compromised or instrumented environment.
///
/// `ld_preload` is the process's `LD_PRELOAD` value; `loaded_modules` the
/// current module inventory.
pub fn detect(root: &Path, ld_preload: Option<&str>, loaded_modules: &BTreeSet<String>) -> Vec<String> {
    let mut findings = Vec::new();

    for rel in existing(root, SU_PATHS) {
        findings.push(format!("su binary /{rel}"));
    }
    for rel in existing(root, MAGISK_PATHS) {
        findings.push(format!("magisk artifact /{rel}"));
    }
    for rel in existing(root, HOOK_FRAMEWORK_PATHS) {
        findings.push(format!("hook framework /{rel}"));
    }
    for rel in existing(root, FRIDA_PATHS) {
        findings.push(format!("frida server /{rel}"));
    }

    if let Ok(contents) = std::fs::read_to_string(root.join("etc/ld.so.preload")) {
        let entries: Vec<&str> = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        if !entries.is_empty() {
            findings.push(format!("system preload list: {}", entries.join(", ")));
        }
    }

    if let Some(value) = ld_preload.map(str::trim).filter(|v| !v.is_empty()) {
        findings.push(format!("LD_PRELOAD={value}"));
    }

    if let Some(pid) = tracer_pid(root) {
        findings.push(format!("tracer attached (pid {pid})"));
    }

    for module in loaded_modules {
        let lower = module.to_lowercase();
        if INSTRUMENTATION_MODULES.iter().any(|m| lower.contains(m)) {
            findings.push(format!("instrumentation module {module} loaded"));
        }
    }

    findings
}

/// Non-zero `TracerPid` from `proc/self/status`.
fn tracer_pid(root: &Path) -> Option<i32> {
    let path = root.join("proc/self/status");
    match Status::from_file(&path) {
        Ok(status) => (status.tracerpid != 0).then_some(status.tracerpid),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "process status unavailable");
            None
        }
    }
}
