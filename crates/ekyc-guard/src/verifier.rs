//! Symbol integrity verification -- has a method been swizzled or hooked?
//!
//! ## What "expected implementation" means
//!
//! The expected implementation is the address recorded when the method was
//! registered in the dispatch table. A live implementation passes only if
//! all of the following hold, checked in this order:
//!
//! 1. it lies in an executable segment of some loaded image
//!    (otherwise: trampoline or generated code),
//! 2. that image is the one owning the recorded address
//!    (otherwise: foreign module),
//! 3. that image was present when the baseline was captured,
//! 4. it equals the recorded address (otherwise: swizzled),
//! 5. its first bytes still match the fingerprint taken at registration
//!    (otherwise: inline patch).

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::platform::{ImageEnumerator, MemoryReader, Platform, ResolvedSymbol, SymbolResolver};
use crate::types::{DispatchKind, ImageMap, Interception, SymbolCheckResult, SymbolTarget};

/// Checks named entry points against their trusted implementations.
///
/// Holds only shared references; safe to use from many threads at once.
pub struct SymbolVerifier<'a> {
    symbols: &'a dyn SymbolResolver,
    images: &'a dyn ImageEnumerator,
    memory: &'a dyn MemoryReader,
    baseline: &'a BTreeSet<String>,
}

impl<'a> SymbolVerifier<'a> {
    pub fn new(
        symbols: &'a dyn SymbolResolver,
        images: &'a dyn ImageEnumerator,
        memory: &'a dyn MemoryReader,
        baseline: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            symbols,
            images,
            memory,
            baseline,
        }
    }

    pub fn from_platform(platform: &'a Platform, baseline: &'a BTreeSet<String>) -> Self {
        Self::new(
            platform.symbols.as_ref(),
            platform.images.as_ref(),
            platform.memory.as_ref(),
            baseline,
        )
    }

    /// Verify one method.
    ///
    /// A missing class or selector yields `TargetNotFound`, never
    /// `TamperDetected`.
    pub fn check_symbol(&self, class_name: &str, selector: &str, is_class_method: bool) -> SymbolCheckResult {
        self.check_target(&SymbolTarget::new(class_name, selector, is_class_method))
    }

    pub fn check_target(&self, target: &SymbolTarget) -> SymbolCheckResult {
        let kind = DispatchKind::from_class_method(target.is_class_method);

        let resolved = match self.symbols.resolve(&target.class_name, &target.selector, kind) {
            Ok(r) => r,
            Err(e) => {
                debug!(symbol = %target.check_name(), error = %e, "symbol target not found");
                return SymbolCheckResult::not_found(target, format!("target not found: {e}"));
            }
        };

        let images = match self.images.enumerate() {
            Ok(map) => map,
            Err(e) => {
                return SymbolCheckResult::baseline_unavailable(
                    target,
                    format!("cannot attribute implementation: {e}"),
                );
            }
        };

        match self.inspect(&resolved, &images) {
            Ok(owner) => SymbolCheckResult::intact(
                target,
                format!(
                    "{}[{} {}] intact: {:#x} in {owner}{}",
                    kind.sigil(),
                    target.class_name,
                    target.selector,
                    resolved.live,
                    if resolved.fingerprint.is_some() {
                        " (code fingerprint verified)"
                    } else {
                        ""
                    }
                ),
            ),
            Err(finding) => {
                warn!(symbol = %target.check_name(), finding = %finding, "symbol interception detected");
                SymbolCheckResult::tampered(target, finding)
            }
        }
    }

    /// Name of the owning module on success, the detected mechanism otherwise.
    fn inspect(&self, resolved: &ResolvedSymbol, images: &ImageMap) -> Result<String, Interception> {
        let live = resolved.live;

        let owner = images
            .owner_of(live)
            .ok_or(Interception::UnmappedCode { live })?;

        let expected = images.owner_of(resolved.recorded);
        if expected.map(|e| e.path.as_str()) != Some(owner.path.as_str()) {
            return Err(Interception::ForeignModule {
                expected: expected.map_or_else(|| String::from("<unmapped>"), |e| e.name.clone()),
                actual: owner.name.clone(),
            });
        }

        if !self.baseline.contains(&owner.name) {
            return Err(Interception::UntrustedModule {
                module: owner.name.clone(),
            });
        }

        if live != resolved.recorded {
            return Err(Interception::PointerReplaced {
                recorded: resolved.recorded,
                live,
            });
        }

        if let Some(recorded_fp) = &resolved.fingerprint {
            let bytes = self
                .memory
                .read(live, resolved.fingerprint_len)
                .map_err(|e| Interception::UnreadableCode {
                    live,
                    reason: e.to_string(),
                })?;
            if crate::hash::code_fingerprint(live, &bytes) != *recorded_fp {
                return Err(Interception::InlinePatch { live });
            }
        }

        Ok(owner.name.clone())
    }
}
