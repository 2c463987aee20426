//! Loaded module and baseline types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::sha256_bytes;

/// Half-open virtual address range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    pub start: usize,
    pub end: usize,
}

impl AddressRange {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.start && addr < self.end
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An executable image mapped into the process, as seen by an enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedImage {
    /// Canonical module name (extension stripped)
    pub name: String,
    /// Path the image was mapped from (or a pseudo path like `[vdso]`)
    pub path: String,
    /// Lowest to highest address of every mapping of this image
    pub span: AddressRange,
    /// Executable segments only
    pub executable: Vec<AddressRange>,
}

impl LoadedImage {
    /// Whether `addr` falls inside one of this image's executable segments.
    #[must_use]
    pub fn contains_code(&self, addr: usize) -> bool {
        self.executable.iter().any(|seg| seg.contains(addr))
    }

    /// Immutable record of this image for a baseline.
    #[must_use]
    pub fn record(&self) -> ModuleRecord {
        ModuleRecord {
            name: self.name.clone(),
            path: self.path.clone(),
            load_address_range: (self.span.start, self.span.len()),
        }
    }
}

/// A point-in-time view of every loaded executable image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMap {
    pub images: Vec<LoadedImage>,
}

impl ImageMap {
    #[must_use]
    pub const fn new(images: Vec<LoadedImage>) -> Self {
        Self { images }
    }

    /// Find the image whose executable segments contain `addr`.
    #[must_use]
    pub fn owner_of(&self, addr: usize) -> Option<&LoadedImage> {
        self.images.iter().find(|img| img.contains_code(addr))
    }

    /// Attribute a return address.
    ///
    /// A call at the very end of a function leaves a return address one
    /// past its last byte, so `addr - 1` is tried when `addr` misses.
    #[must_use]
    pub fn owner_of_return_address(&self, addr: usize) -> Option<&LoadedImage> {
        self.owner_of(addr)
            .or_else(|| addr.checked_sub(1).and_then(|a| self.owner_of(a)))
    }

    /// Deduplicated module names.
    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        self.images.iter().map(|img| img.name.clone()).collect()
    }

    #[must_use]
    pub fn records(&self) -> BTreeSet<ModuleRecord> {
        self.images.iter().map(LoadedImage::record).collect()
    }
}

/// Identifies one loaded executable image. Immutable once captured.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Canonical module name
    pub name: String,
    /// Mapping path
    pub path: String,
    /// `(base, size)` of the whole image
    pub load_address_range: (usize, usize),
}

/// Module set trusted at first access.
///
/// Append-only truth: modules loaded after capture are suspicious until the
/// owner explicitly re-baselines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustBaseline {
    /// When the inventory was taken
    pub captured_at: DateTime<Utc>,
    /// Every module present at capture time
    pub modules: BTreeSet<ModuleRecord>,
}

impl TrustBaseline {
    /// Build a baseline from an image map captured now.
    #[must_use]
    pub fn from_images(images: &ImageMap) -> Self {
        Self {
            captured_at: Utc::now(),
            modules: images.records(),
        }
    }

    /// Trusted module names.
    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        self.modules.iter().map(|m| m.name.clone()).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name == name)
    }

    /// SHA-256 over `count || name|name|...` of the sorted name set.
    ///
    /// Load addresses are excluded so the digest is stable across ASLR.
    #[must_use]
    pub fn digest(&self) -> String {
        let names = self.names();
        let mut material = Vec::new();
        material.extend_from_slice(names.len().to_string().as_bytes());
        for name in &names {
            material.extend_from_slice(b"|");
            material.extend_from_slice(name.as_bytes());
        }
        sha256_bytes(&material)
    }
}
