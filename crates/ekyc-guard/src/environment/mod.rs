//! Device and environment signals.
//!
//! Each probe reads well-known filesystem locations relative to a root
//! directory (normally `/`), so tests can point it at a fabricated tree.
//!
//! - **Virtual camera** -- V4L2 loopback devices and drivers
//! - **Simulator** -- hypervisor DMI strings, CPU flag, emulator artifacts
//! - **Jailbreak** -- root/su, Magisk, hook frameworks, preload injection,
//!   attached tracer, instrumentation modules in the process

pub mod jailbreak;
pub mod simulator;
pub mod virtual_camera;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::inventory::capture_loaded_modules;
use crate::platform::ImageEnumerator;
use crate::types::CheckResult;

/// Check name of the virtual-camera probe.
pub const VIRTUAL_CAMERA: &str = "virtual_camera";
/// Check name of the simulator probe.
pub const SIMULATOR: &str = "simulator";
/// Check name of the jailbreak probe.
pub const JAILBREAK: &str = "jailbreak";

/// Source of environment signals.
pub trait EnvironmentProbe: Send + Sync {
    fn virtual_camera(&self) -> CheckResult;

    fn simulator(&self) -> CheckResult;

    /// `loaded_modules` is the current inventory, scanned for
    /// instrumentation toolkits.
    fn jailbreak(&self, loaded_modules: &BTreeSet<String>) -> CheckResult;
}

/// Probes the host filesystem under `root`.
#[derive(Debug, Clone)]
pub struct HostEnvironment {
    root: PathBuf,
    ld_preload: Option<String>,
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self::system()
    }
}

impl HostEnvironment {
    /// The live system, including this process's `LD_PRELOAD`.
    #[must_use]
    pub fn system() -> Self {
        Self {
            root: PathBuf::from("/"),
            ld_preload: std::env::var("LD_PRELOAD").ok(),
        }
    }

    /// Probe a tree rooted at `root`; no preload variable is assumed.
    pub fn at_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ld_preload: None,
        }
    }

    /// Override the `LD_PRELOAD` value considered by the jailbreak probe.
    #[must_use]
    pub fn with_ld_preload(mut self, value: Option<String>) -> Self {
        self.ld_preload = value;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl EnvironmentProbe for HostEnvironment {
    fn virtual_camera(&self) -> CheckResult {
        CheckResult::from_findings(
            VIRTUAL_CAMERA,
            "no virtual camera devices",
            &virtual_camera::detect(&self.root),
        )
    }

    fn simulator(&self) -> CheckResult {
        CheckResult::from_findings(
            SIMULATOR,
            "no simulator or hypervisor indicators",
            &simulator::detect(&self.root),
        )
    }

    fn jailbreak(&self, loaded_modules: &BTreeSet<String>) -> CheckResult {
        CheckResult::from_findings(
            JAILBREAK,
            "no root, hook framework or instrumentation indicators",
            &jailbreak::detect(&self.root, self.ld_preload.as_deref(), loaded_modules),
        )
    }
}

/// Jailbreak probe fed with the current module inventory.
///
/// If the inventory cannot be read the instrumentation scan did not run,
/// so the result fails even when the filesystem probes are clean.
pub fn jailbreak_check(images: &dyn ImageEnumerator, probe: &dyn EnvironmentProbe) -> CheckResult {
    match capture_loaded_modules(images) {
        Ok(modules) => probe.jailbreak(&modules),
        Err(e) => {
            let partial = probe.jailbreak(&BTreeSet::new());
            let mut message = format!("module inventory unavailable: {e}");
            if !partial.success {
                message = format!("{}; {message}", partial.message);
            }
            CheckResult::fail(JAILBREAK, message)
        }
    }
}

/// Read a small text file, trimmed. Missing or unreadable -> `None`.
pub(crate) fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
}

/// Root-relative paths from `candidates` that exist under `root`.
pub(crate) fn existing<'a>(root: &Path, candidates: &[&'a str]) -> Vec<&'a str> {
    candidates
        .iter()
        .copied()
        .filter(|rel| root.join(rel).exists())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GuardError, Result};
    use crate::types::{AddressRange, ImageMap, LoadedImage};
    use tempfile::TempDir;

    struct Images(Option<&'static str>);

    impl ImageEnumerator for Images {
        fn enumerate(&self) -> Result<ImageMap> {
            let Some(name) = self.0 else {
                return Err(GuardError::BaselineUnavailable("maps unreadable".into()));
            };
            Ok(ImageMap::new(vec![LoadedImage {
                name: name.into(),
                path: format!("/usr/lib/{name}.so"),
                span: AddressRange::new(0x1000, 0x9000),
                executable: vec![AddressRange::new(0x2000, 0x8000)],
            }]))
        }
    }

    #[test]
    fn empty_root_is_clean() {
        let dir = TempDir::new().unwrap();
        let env = HostEnvironment::at_root(dir.path());

        assert!(env.virtual_camera().success);
        assert!(env.simulator().success);
        assert!(env.jailbreak(&BTreeSet::new()).success);
    }

    #[test]
    fn check_names_are_stable() {
        let dir = TempDir::new().unwrap();
        let env = HostEnvironment::at_root(dir.path());

        assert_eq!(env.virtual_camera().name, VIRTUAL_CAMERA);
        assert_eq!(env.simulator().name, SIMULATOR);
        assert_eq!(env.jailbreak(&BTreeSet::new()).name, JAILBREAK);
    }

    #[test]
    fn preload_override_feeds_jailbreak_probe() {
        let dir = TempDir::new().unwrap();
        let env = HostEnvironment::at_root(dir.path()).with_ld_preload(Some("/tmp/hook.so".into()));
        let r = env.jailbreak(&BTreeSet::new());
        assert!(!r.success);
        assert!(r.message.contains("/tmp/hook.so"));
    }

    #[test]
    fn jailbreak_check_scans_the_inventory() {
        let dir = TempDir::new().unwrap();
        let env = HostEnvironment::at_root(dir.path());

        assert!(jailbreak_check(&Images(Some("libc")), &env).success);
        let r = jailbreak_check(&Images(Some("frida-gadget")), &env);
        assert!(!r.success);
        assert!(r.message.contains("frida-gadget"));
    }

    #[test]
    fn unreadable_inventory_fails_a_clean_tree() {
        let dir = TempDir::new().unwrap();
        let env = HostEnvironment::at_root(dir.path());

        let r = jailbreak_check(&Images(None), &env);
        assert!(!r.success);
        assert_eq!(r.name, JAILBREAK);
        assert!(r.message.starts_with("module inventory unavailable"), "{}", r.message);
    }
}
