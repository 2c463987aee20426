//! Simulator, emulator and virtual machine detection.

use std::path::Path;

use procfs::prelude::*;
use procfs::CpuInfo;
use tracing::debug;

use super::{existing, read_trimmed};

/// DMI identification files.
const DMI_FILES: &[&str] = &[
    "sys/class/dmi/id/product_name",
    "sys/class/dmi/id/sys_vendor",
    "sys/class/dmi/id/board_vendor",
];

/// DMI strings naming a hypervisor vendor or product.
const VM_INDICATORS: &[&str] = &[
    "VMware",
    "VirtualBox",
    "QEMU",
    "KVM",
    "Xen",
    "Parallels",
    "innotek GmbH",
    "Bochs",
];

/// Android emulator artifacts.
const EMULATOR_FILES: &[&str] = &[
    "dev/socket/qemud",
    "dev/qemu_pipe",
    "sys/qemu_trace",
    "system/bin/qemu-props",
    "system/lib/libc_malloc_debug_qemu.so",
    "sys/bus/platform/drivers/qemu_pipe",
    "dev/socket/genyd",
    "dev/socket/baseband_genyd",
];

/// Hyper-V guests report the Microsoft vendor with this product name.
/// The vendor alone also covers Surface hardware.
const HYPERV_VENDOR: &str = "Microsoft Corporation";
const HYPERV_PRODUCT: &str = "Virtual Machine";

/// CPU `Hardware` values reported by Android emulators.
const EMULATOR_HARDWARE: &[&str] = &["goldfish", "ranchu", "vbox86"];

/// Findings for simulated execution under `root`.
pub fn detect(root: &Path) -> Vec<String> {
    let mut findings = Vec::new();

    for rel in DMI_FILES {
        let Some(value) = read_trimmed(&root.join(rel)) else {
            continue;
        };
        if let Some(indicator) = VM_INDICATORS.iter().find(|i| value.contains(*i)) {
            findings.push(format!("hypervisor vendor {indicator} in {rel}"));
        }
    }
    if let Some(finding) = hyperv(root) {
        findings.push(finding);
    }

    let cpuinfo_path = root.join("proc/cpuinfo");
    match CpuInfo::from_file(&cpuinfo_path) {
        Ok(cpuinfo) => {
            if cpuinfo
                .flags(0)
                .is_some_and(|flags| flags.contains(&"hypervisor"))
            {
                findings.push(String::from("cpu reports hypervisor flag"));
            }
        }
        Err(e) => {
            debug!(path = %cpuinfo_path.display(), error = %e, "cpuinfo unavailable");
        }
    }
    // ARM kernels print `Hardware` in a trailing block CpuInfo does not keep.
    if let Some(hardware) = read_trimmed(&cpuinfo_path).as_deref().and_then(cpu_hardware) {
        let lower = hardware.to_lowercase();
        if EMULATOR_HARDWARE.iter().any(|h| lower.contains(h)) {
            findings.push(format!("emulator cpu hardware {hardware}"));
        }
    }

    for rel in existing(root, EMULATOR_FILES) {
        findings.push(format!("emulator artifact /{rel}"));
    }

    findings
}

fn hyperv(root: &Path) -> Option<String> {
    let vendor = read_trimmed(&root.join("sys/class/dmi/id/sys_vendor"))?;
    let product = read_trimmed(&root.join("sys/class/dmi/id/product_name"))?;
    (vendor.contains(HYPERV_VENDOR) && product == HYPERV_PRODUCT)
        .then(|| format!("hyper-v guest ({vendor} {product})"))
}

/// Value of the first `Hardware` line in cpuinfo text.
fn cpu_hardware(cpuinfo: &str) -> Option<&str> {
    cpuinfo.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "Hardware").then_some(value.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    const BARE_METAL_CPU: &str = "processor\t: 0\nvendor_id\t: GenuineIntel\nflags\t\t: fpu vme de pse tsc\n\n";
    const GUEST_CPU: &str = "processor\t: 0\nvendor_id\t: GenuineIntel\nflags\t\t: fpu vme de hypervisor\n\n";

    #[test]
    fn bare_metal_is_clean() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "sys/class/dmi/id/sys_vendor", "LENOVO\n");
        write(dir.path(), "proc/cpuinfo", BARE_METAL_CPU);
        assert!(detect(dir.path()).is_empty());
    }

    #[test]
    fn dmi_vendor_is_flagged() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "sys/class/dmi/id/product_name", "VirtualBox\n");
        let findings = detect(dir.path());
        assert_eq!(findings.len(), 1);
        assert!(findings[0].contains("VirtualBox"));
    }

    #[test]
    fn hypervisor_flag_is_flagged() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "proc/cpuinfo", GUEST_CPU);
        assert_eq!(detect(dir.path()), vec!["cpu reports hypervisor flag"]);
    }

    #[test]
    fn arm64_emulator_hardware_is_flagged() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "proc/cpuinfo",
            "processor\t: 0\nBogoMIPS\t: 125.00\nFeatures\t: fp asimd\n\nHardware\t: ranchu\n",
        );
        assert_eq!(detect(dir.path()), vec!["emulator cpu hardware ranchu"]);
    }

    #[test]
    fn arm64_device_hardware_is_clean() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "proc/cpuinfo",
            "processor\t: 0\nFeatures\t: fp asimd\n\nHardware\t: Qualcomm Technologies, Inc SM8550\n",
        );
        assert!(detect(dir.path()).is_empty());
    }

    #[test]
    fn surface_laptop_is_not_a_vm() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "sys/class/dmi/id/sys_vendor", "Microsoft Corporation\n");
        write(dir.path(), "sys/class/dmi/id/product_name", "Surface Laptop 5\n");
        write(dir.path(), "proc/cpuinfo", BARE_METAL_CPU);
        assert!(detect(dir.path()).is_empty());
    }

    #[test]
    fn hyperv_guest_is_flagged() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "sys/class/dmi/id/sys_vendor", "Microsoft Corporation\n");
        write(dir.path(), "sys/class/dmi/id/product_name", "Virtual Machine\n");
        assert_eq!(
            detect(dir.path()),
            vec!["hyper-v guest (Microsoft Corporation Virtual Machine)"]
        );
    }

    #[test]
    fn emulator_pipe_is_flagged() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dev/qemu_pipe", "");
        assert_eq!(detect(dir.path()), vec!["emulator artifact /dev/qemu_pipe"]);
    }
}
