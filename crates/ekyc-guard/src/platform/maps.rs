//! Loaded-image enumeration via `/proc/self/maps`.

use std::collections::HashMap;
use std::path::PathBuf;

use procfs::prelude::*;
use procfs::process::{MMPermissions, MMapPath, MemoryMaps};
use tracing::debug;

use super::ImageEnumerator;
use crate::error::{GuardError, Result};
use crate::types::{AddressRange, ImageMap, LoadedImage};

/// Default maps file for the current process.
pub const SELF_MAPS: &str = "/proc/self/maps";

/// Suffixes stripped from module file names.
const IMAGE_EXTENSIONS: &[&str] = &[".dylib", ".dll", ".exe", ".bundle", ".framework"];

/// Enumerates images from a `maps` file.
///
/// Only file-backed mappings (plus the `[vdso]`/`[vsyscall]` pseudo images)
/// that have at least one executable segment count as modules. Anonymous
/// executable memory never does.
#[derive(Debug, Clone)]
pub struct ProcMapsEnumerator {
    maps_path: PathBuf,
}

impl Default for ProcMapsEnumerator {
    fn default() -> Self {
        Self {
            maps_path: PathBuf::from(SELF_MAPS),
        }
    }
}

impl ProcMapsEnumerator {
    /// Read from an arbitrary maps file (another pid, or a fixture).
    pub fn from_path(maps_path: impl Into<PathBuf>) -> Self {
        Self {
            maps_path: maps_path.into(),
        }
    }
}

impl ImageEnumerator for ProcMapsEnumerator {
    fn enumerate(&self) -> Result<ImageMap> {
        let maps = MemoryMaps::from_file(&self.maps_path).map_err(|e| {
            GuardError::BaselineUnavailable(format!("{}: {e}", self.maps_path.display()))
        })?;

        // Keyed by mapping path, in first-seen order
        let mut order: Vec<String> = Vec::new();
        let mut images: HashMap<String, LoadedImage> = HashMap::new();

        for map in maps {
            let Some(path) = image_path(&map.pathname) else {
                continue;
            };

            #[allow(clippy::cast_possible_truncation)]
            let range = AddressRange::new(map.address.0 as usize, map.address.1 as usize);
            let executable = map.perms.contains(MMPermissions::EXECUTE);

            let image = images.entry(path.clone()).or_insert_with(|| {
                order.push(path.clone());
                LoadedImage {
                    name: canonical_module_name(&path),
                    path: path.clone(),
                    span: range,
                    executable: Vec::new(),
                }
            });

            image.span.start = image.span.start.min(range.start);
            image.span.end = image.span.end.max(range.end);
            if executable {
                image.executable.push(range);
            }
        }

        let mut loaded = Vec::with_capacity(order.len());
        for path in order {
            if let Some(image) = images.remove(&path) {
                if image.executable.is_empty() {
                    debug!(path = %image.path, "skipping mapping without code");
                    continue;
                }
                loaded.push(image);
            }
        }

        debug!(images = loaded.len(), "enumerated loaded images");
        Ok(ImageMap::new(loaded))
    }
}

/// Path a mapping belongs to, or `None` for anonymous/heap/stack memory.
fn image_path(pathname: &MMapPath) -> Option<String> {
    match pathname {
        MMapPath::Path(p) => Some(p.display().to_string()),
        MMapPath::Vdso => Some(String::from("[vdso]")),
        MMapPath::Vsyscall => Some(String::from("[vsyscall]")),
        _ => None,
    }
}

/// Canonical module name: file name with library extensions stripped.
///
/// - `/usr/lib/libc.so.6` -> `libc`
/// - `/opt/app/Foo.dylib` -> `Foo`
/// - `/usr/bin/python3.11` -> `python3.11`
/// - `[vdso]` -> `[vdso]`
#[must_use]
pub fn canonical_module_name(path: &str) -> String {
    let path = path.strip_suffix(" (deleted)").unwrap_or(path);
    let file = path.rsplit('/').next().unwrap_or(path);

    if let Some(stem) = strip_shared_object(file) {
        return stem.to_string();
    }
    for ext in IMAGE_EXTENSIONS {
        if let Some(stem) = file.strip_suffix(ext) {
            if !stem.is_empty() {
                return stem.to_string();
            }
        }
    }
    file.to_string()
}

/// `libfoo.so`, `libfoo.so.1`, `libfoo.so.1.2.3` -> `libfoo`.
fn strip_shared_object(file: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(pos) = file[search_from..].find(".so") {
        let at = search_from + pos;
        let rest = &file[at + 3..];
        if at > 0 && (rest.is_empty() || rest.starts_with('.')) {
            return Some(&file[..at]);
        }
        search_from = at + 3;
    }
    None
}
