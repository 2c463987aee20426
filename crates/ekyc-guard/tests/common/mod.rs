//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use ekyc_guard::platform::{ImageEnumerator, MemoryReader, StackWalker, UnwindError};
use ekyc_guard::{
    AddressRange, CheckResult, DispatchTable, EnvironmentProbe, GuardError, ImageMap, LoadedImage, Platform, Result,
};

pub const APP_CODE: usize = 0x10_000;
pub const LIBC_CODE: usize = 0x30_000;
pub const INJECTED_CODE: usize = 0x50_000;
pub const UNMAPPED: usize = 0x9999_0000;

pub fn image(name: &str, path: &str, start: usize) -> LoadedImage {
    LoadedImage {
        name: name.into(),
        path: path.into(),
        span: AddressRange::new(start, start + 0x10_000),
        executable: vec![AddressRange::new(start, start + 0x8000)],
    }
}

pub fn app() -> LoadedImage {
    image("app", "/usr/bin/app", APP_CODE)
}

pub fn libc() -> LoadedImage {
    image("libc", "/usr/lib/libc.so.6", LIBC_CODE)
}

pub fn injected() -> LoadedImage {
    image("libinject", "/tmp/libinject.so", INJECTED_CODE)
}

pub fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(ToString::to_string).collect()
}

/// Image list that can grow (library injection) or start failing.
pub struct ProcessImages {
    images: RwLock<Vec<LoadedImage>>,
    failing: AtomicBool,
    pub enumerations: AtomicUsize,
}

impl ProcessImages {
    pub fn new(images: Vec<LoadedImage>) -> Self {
        Self {
            images: RwLock::new(images),
            failing: AtomicBool::new(false),
            enumerations: AtomicUsize::new(0),
        }
    }

    pub fn standard() -> Self {
        Self::new(vec![app(), libc()])
    }

    pub fn load(&self, image: LoadedImage) {
        self.images.write().unwrap().push(image);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl ImageEnumerator for ProcessImages {
    fn enumerate(&self) -> Result<ImageMap> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(GuardError::BaselineUnavailable("maps unreadable".into()));
        }
        Ok(ImageMap::new(self.images.read().unwrap().clone()))
    }
}

/// Returns a scripted walk.
pub struct ScriptedStack(Mutex<std::result::Result<Vec<usize>, UnwindError>>);

impl ScriptedStack {
    pub fn frames(frames: Vec<usize>) -> Self {
        Self(Mutex::new(Ok(frames)))
    }

    pub fn failing(error: UnwindError) -> Self {
        Self(Mutex::new(Err(error)))
    }

    pub fn set(&self, walk: std::result::Result<Vec<usize>, UnwindError>) {
        *self.0.lock().unwrap() = walk;
    }
}

impl StackWalker for ScriptedStack {
    fn walk(&self) -> std::result::Result<Vec<usize>, UnwindError> {
        self.0.lock().unwrap().clone()
    }
}

/// Code memory filled with `nop`, patchable per address.
#[derive(Default)]
pub struct CodeMemory {
    patched: RwLock<HashMap<usize, Vec<u8>>>,
    unreadable: RwLock<HashSet<usize>>,
}

impl CodeMemory {
    pub fn patch(&self, address: usize, bytes: &[u8]) {
        self.patched.write().unwrap().insert(address, bytes.to_vec());
    }

    pub fn revoke(&self, address: usize) {
        self.unreadable.write().unwrap().insert(address);
    }
}

impl MemoryReader for CodeMemory {
    fn read(&self, address: usize, len: usize) -> std::io::Result<Vec<u8>> {
        if self.unreadable.read().unwrap().contains(&address) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "page not readable",
            ));
        }
        let mut bytes = vec![0x90; len];
        if let Some(patch) = self.patched.read().unwrap().get(&address) {
            for (dst, src) in bytes.iter_mut().zip(patch) {
                *dst = *src;
            }
        }
        Ok(bytes)
    }
}

/// Environment probe with fixed answers.
#[derive(Default)]
pub struct FixedEnvironment {
    pub virtual_camera: bool,
    pub simulator: bool,
    pub jailbroken: bool,
}

impl EnvironmentProbe for FixedEnvironment {
    fn virtual_camera(&self) -> CheckResult {
        if self.virtual_camera {
            CheckResult::fail("virtual_camera", "virtual camera device video9: OBS Virtual Camera")
        } else {
            CheckResult::pass("virtual_camera", "no virtual camera devices")
        }
    }

    fn simulator(&self) -> CheckResult {
        if self.simulator {
            CheckResult::fail("simulator", "cpu reports hypervisor flag")
        } else {
            CheckResult::pass("simulator", "no simulator or hypervisor indicators")
        }
    }

    fn jailbreak(&self, _loaded_modules: &BTreeSet<String>) -> CheckResult {
        if self.jailbroken {
            CheckResult::fail("jailbreak", "su binary /system/xbin/su")
        } else {
            CheckResult::pass("jailbreak", "no root, hook framework or instrumentation indicators")
        }
    }
}

/// Everything a test needs to drive a policy or a checker.
pub struct Harness {
    pub images: Arc<ProcessImages>,
    pub stack: Arc<ScriptedStack>,
    pub memory: Arc<CodeMemory>,
    pub table: Arc<DispatchTable>,
}

impl Harness {
    /// Standard process (app + libc), a stack inside app and libc, and
    /// `-[Camera capture_output]` registered at the start of app's code.
    pub fn new() -> Self {
        let memory = Arc::new(CodeMemory::default());
        let table = Arc::new(DispatchTable::with_reader(memory.clone(), 16));
        table
            .register("Camera", "capture_output", ekyc_guard::DispatchKind::Instance, APP_CODE + 0x100)
            .unwrap();
        Self {
            images: Arc::new(ProcessImages::standard()),
            stack: Arc::new(ScriptedStack::frames(vec![APP_CODE + 0x200, LIBC_CODE + 0x80, APP_CODE + 0x40])),
            memory,
            table,
        }
    }

    pub fn platform(&self) -> Platform {
        Platform {
            images: self.images.clone(),
            stack: self.stack.clone(),
            memory: self.memory.clone(),
            symbols: self.table.clone(),
        }
    }
}
