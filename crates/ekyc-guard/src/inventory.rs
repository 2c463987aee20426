//! Module inventory -- which executable images are loaded right now.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::platform::{ImageEnumerator, ProcMapsEnumerator};
use crate::types::{ModuleRecord, TrustBaseline};

/// Canonical, deduplicated names of every loaded executable image.
///
/// Idempotent and cheap enough to call again when re-baselining.
///
/// # Errors
///
/// Returns `GuardError::BaselineUnavailable` if enumeration fails.
pub fn capture_loaded_modules(images: &dyn ImageEnumerator) -> Result<BTreeSet<String>> {
    Ok(images.enumerate()?.names())
}

/// Same as [`capture_loaded_modules`] with full records.
pub fn capture_module_records(images: &dyn ImageEnumerator) -> Result<BTreeSet<ModuleRecord>> {
    Ok(images.enumerate()?.records())
}

/// Inventory of the current process through `/proc/self/maps`.
pub fn loaded_module_names() -> Result<BTreeSet<String>> {
    capture_loaded_modules(&ProcMapsEnumerator::default())
}

/// Capture a trust baseline now.
pub fn capture_baseline(images: &dyn ImageEnumerator) -> Result<TrustBaseline> {
    let map = images.enumerate()?;
    let baseline = TrustBaseline::from_images(&map);
    let digest = baseline.digest();
    info!(
        modules = baseline.modules.len(),
        digest = &digest[..12],
        "trust baseline captured"
    );
    Ok(baseline)
}

/// Difference between a baseline and the current inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDrift {
    /// Loaded now, absent from the baseline
    pub added: BTreeSet<String>,
    /// In the baseline, no longer loaded
    pub removed: BTreeSet<String>,
}

impl ModuleDrift {
    #[must_use]
    pub fn between(baseline: &BTreeSet<String>, current: &BTreeSet<String>) -> Self {
        Self {
            added: current.difference(baseline).cloned().collect(),
            removed: baseline.difference(current).cloned().collect(),
        }
    }

    /// Unloading is benign; only additions count as drift.
    #[must_use]
    pub fn is_suspicious(&self) -> bool {
        !self.added.is_empty()
    }
}
