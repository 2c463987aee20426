//! Dispatch table of sensitive entry points.
//!
//! The integrating application registers each security-relevant method
//! (e.g. the camera frame-delivery callback) by class name, selector and
//! dispatch kind while the process is still trusted. The address given at
//! registration is the *recorded* implementation; the *live* one can later
//! be exchanged, which is exactly what a swizzling hook does. The symbol
//! verifier compares the two.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::{GuardError, Result};
use crate::hash::code_fingerprint;
use crate::platform::{MemoryReader, ProcMemReader, ResolveError, ResolvedSymbol, SymbolResolver};
use crate::types::{DispatchKind, SymbolTarget};

/// Bytes fingerprinted at each registered implementation.
pub const DEFAULT_PROLOGUE_BYTES: usize = 16;

#[derive(Debug)]
struct MethodSlot {
    live: AtomicUsize,
    recorded: usize,
    fingerprint: Option<String>,
}

type MethodKey = (String, DispatchKind);

/// Thread-safe registry mapping (class, selector, kind) to implementations.
pub struct DispatchTable {
    classes: RwLock<HashMap<String, HashMap<MethodKey, Arc<MethodSlot>>>>,
    memory: Arc<dyn MemoryReader>,
    prologue_bytes: usize,
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("methods", &self.len())
            .field("prologue_bytes", &self.prologue_bytes)
            .finish_non_exhaustive()
    }
}

impl DispatchTable {
    /// Table fingerprinting through `/proc/self/mem`.
    pub fn new() -> Self {
        Self::with_reader(Arc::new(ProcMemReader::default()), DEFAULT_PROLOGUE_BYTES)
    }

    /// Table with a custom reader; `prologue_bytes == 0` disables fingerprints.
    pub fn with_reader(memory: Arc<dyn MemoryReader>, prologue_bytes: usize) -> Self {
        Self {
            classes: RwLock::new(HashMap::new()),
            memory,
            prologue_bytes,
        }
    }

    /// Number of bytes each fingerprint covers.
    #[must_use]
    pub const fn prologue_bytes(&self) -> usize {
        self.prologue_bytes
    }

    /// Record the trusted implementation of a method.
    ///
    /// Registering the same (class, selector, kind) twice is refused so a
    /// hook cannot be laundered into the recorded address.
    pub fn register(
        &self,
        class_name: &str,
        selector: &str,
        kind: DispatchKind,
        implementation: usize,
    ) -> Result<()> {
        let fingerprint = self.fingerprint(implementation);

        let mut classes = self.classes.write().unwrap_or_else(PoisonError::into_inner);
        let methods = classes.entry(class_name.to_string()).or_default();
        let key = (selector.to_string(), kind);
        if methods.contains_key(&key) {
            return Err(GuardError::Config(format!(
                "{}[{class_name} {selector}] is already registered",
                kind.sigil()
            )));
        }

        debug!(
            class = class_name,
            selector,
            address = format_args!("{implementation:#x}"),
            fingerprinted = fingerprint.is_some(),
            "registered implementation"
        );
        methods.insert(
            key,
            Arc::new(MethodSlot {
                live: AtomicUsize::new(implementation),
                recorded: implementation,
                fingerprint,
            }),
        );
        Ok(())
    }

    /// Currently installed implementation, if the method exists.
    #[must_use]
    pub fn implementation(&self, class_name: &str, selector: &str, kind: DispatchKind) -> Option<usize> {
        self.slot(class_name, selector, kind)
            .ok()
            .map(|slot| slot.live.load(Ordering::Acquire))
    }

    /// Install a new implementation, returning the previous one.
    pub fn exchange_implementation(
        &self,
        class_name: &str,
        selector: &str,
        kind: DispatchKind,
        implementation: usize,
    ) -> std::result::Result<usize, ResolveError> {
        let slot = self.slot(class_name, selector, kind)?;
        let previous = slot.live.swap(implementation, Ordering::AcqRel);
        debug!(
            class = class_name,
            selector,
            previous = format_args!("{previous:#x}"),
            installed = format_args!("{implementation:#x}"),
            "implementation exchanged"
        );
        Ok(previous)
    }

    /// Every registered method.
    #[must_use]
    pub fn targets(&self) -> Vec<SymbolTarget> {
        let classes = self.classes.read().unwrap_or_else(PoisonError::into_inner);
        let mut targets: Vec<SymbolTarget> = classes
            .iter()
            .flat_map(|(class_name, methods)| {
                methods.keys().map(move |(selector, kind)| {
                    SymbolTarget::new(class_name.clone(), selector.clone(), kind.is_class_method())
                })
            })
            .collect();
        targets.sort_by(|a, b| {
            (&a.class_name, &a.selector, a.is_class_method).cmp(&(&b.class_name, &b.selector, b.is_class_method))
        });
        targets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let classes = self.classes.read().unwrap_or_else(PoisonError::into_inner);
        classes.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(
        &self,
        class_name: &str,
        selector: &str,
        kind: DispatchKind,
    ) -> std::result::Result<Arc<MethodSlot>, ResolveError> {
        let classes = self.classes.read().unwrap_or_else(PoisonError::into_inner);
        let methods = classes
            .get(class_name)
            .ok_or_else(|| ResolveError::ClassNotFound(class_name.to_string()))?;
        methods
            .get(&(selector.to_string(), kind))
            .cloned()
            .ok_or_else(|| ResolveError::SelectorNotFound {
                class_name: class_name.to_string(),
                selector: selector.to_string(),
            })
    }

    fn fingerprint(&self, implementation: usize) -> Option<String> {
        if self.prologue_bytes == 0 {
            return None;
        }
        match self.memory.read(implementation, self.prologue_bytes) {
            Ok(bytes) => Some(code_fingerprint(implementation, &bytes)),
            Err(e) => {
                debug!(
                    address = format_args!("{implementation:#x}"),
                    error = %e,
                    "code unreadable at registration, pointer checks only"
                );
                None
            }
        }
    }
}

impl SymbolResolver for DispatchTable {
    fn resolve(
        &self,
        class_name: &str,
        selector: &str,
        kind: DispatchKind,
    ) -> std::result::Result<ResolvedSymbol, ResolveError> {
        let slot = self.slot(class_name, selector, kind)?;
        Ok(ResolvedSymbol {
            live: slot.live.load(Ordering::Acquire),
            recorded: slot.recorded,
            fingerprint: slot.fingerprint.clone(),
            fingerprint_len: self.prologue_bytes,
        })
    }
}
