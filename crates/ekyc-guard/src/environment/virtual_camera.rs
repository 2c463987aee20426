//! Virtual camera detection via V4L2 sysfs entries.

use std::path::Path;

use tracing::debug;

use super::read_trimmed;

/// Lowercase fragments of virtual-camera device names.
const VIRTUAL_CAMERA_NAMES: &[&str] = &[
    "dummy video device",
    "v4l2loopback",
    "loopback",
    "obs virtual camera",
    "obs cam",
    "manycam",
    "snap camera",
    "xsplit",
    "droidcam",
    "iriun",
    "e2esoft",
    "akvcam",
    "virtual",
];

/// Kernel modules that provide virtual video devices.
const VIRTUAL_CAMERA_MODULES: &[&str] = &["v4l2loopback", "akvcam"];

/// Findings for virtual video devices under `root`.
pub fn detect(root: &Path) -> Vec<String> {
    let mut findings = Vec::new();

    let class_dir = root.join("sys/class/video4linux");
    match std::fs::read_dir(&class_dir) {
        Ok(entries) => {
            let mut devices: Vec<_> = entries.flatten().map(|e| e.path()).collect();
            devices.sort();
            for device in devices {
                let Some(name) = read_trimmed(&device.join("name")) else {
                    continue;
                };
                let lower = name.to_lowercase();
                if VIRTUAL_CAMERA_NAMES.iter().any(|v| lower.contains(v)) {
                    let node = device
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    findings.push(format!("virtual camera device {node}: {name}"));
                }
            }
        }
        Err(e) => {
            debug!(path = %class_dir.display(), error = %e, "no video4linux class");
        }
    }

    for module in VIRTUAL_CAMERA_MODULES {
        if root.join("sys/module").join(module).exists() {
            findings.push(format!("kernel module {module} loaded"));
        }
    }

    findings
}
