//! Platform capabilities for runtime introspection.
//!
//! Every check reaches the process only through these traits, so each one
//! can be driven by a fake in tests and a new target needs only new
//! implementations here.
//!
//! | Capability | Native implementation |
//! |------------|-----------------------|
//! | [`ImageEnumerator`] | [`ProcMapsEnumerator`] (`/proc/self/maps` via `procfs`) |
//! | [`StackWalker`] | [`BacktraceWalker`] (`backtrace::trace`) |
//! | [`MemoryReader`] | [`ProcMemReader`] (`/proc/self/mem`) |
//! | [`SymbolResolver`] | [`crate::dispatch::DispatchTable`] |

pub mod maps;
pub mod memory;
pub mod unwind;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;
use crate::types::{DispatchKind, ImageMap};

pub use maps::{canonical_module_name, ProcMapsEnumerator};
pub use memory::ProcMemReader;
pub use unwind::{BacktraceWalker, DEFAULT_MAX_DEPTH};

/// Enumerates executable images currently mapped into the process.
pub trait ImageEnumerator: Send + Sync {
    fn enumerate(&self) -> Result<ImageMap>;
}

/// Why a stack walk did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnwindError {
    #[error("unwinder returned no frames")]
    Empty,

    #[error("null return address at frame {index}")]
    NullFrame { index: usize },

    #[error("stack deeper than {limit} frames, walk truncated")]
    Truncated { limit: usize },

    #[error("unwinder failed: {0}")]
    Other(String),
}

/// Captures the calling thread's return addresses, innermost first.
pub trait StackWalker: Send + Sync {
    fn walk(&self) -> std::result::Result<Vec<usize>, UnwindError>;
}

/// Reads bytes of the process's own code.
pub trait MemoryReader: Send + Sync {
    fn read(&self, address: usize, len: usize) -> std::io::Result<Vec<u8>>;
}

/// Why a (class, selector) pair could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolveError {
    #[error("class {0} not found")]
    ClassNotFound(String),

    #[error("selector {selector} not found on class {class_name}")]
    SelectorNotFound {
        class_name: String,
        selector: String,
    },
}

/// A live implementation plus what was recorded at trusted-load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSymbol {
    /// Implementation address installed right now
    pub live: usize,
    /// Implementation address at registration
    pub recorded: usize,
    /// Code fingerprint at registration, when one was taken
    pub fingerprint: Option<String>,
    /// Number of bytes the fingerprint covers
    pub fingerprint_len: usize,
}

/// Resolves named entry points to their implementations.
pub trait SymbolResolver: Send + Sync {
    fn resolve(
        &self,
        class_name: &str,
        selector: &str,
        kind: DispatchKind,
    ) -> std::result::Result<ResolvedSymbol, ResolveError>;
}

/// Bundle of capabilities the checks run against.
#[derive(Clone)]
pub struct Platform {
    pub images: Arc<dyn ImageEnumerator>,
    pub stack: Arc<dyn StackWalker>,
    pub memory: Arc<dyn MemoryReader>,
    pub symbols: Arc<dyn SymbolResolver>,
}

impl Platform {
    /// Native capabilities, resolving symbols through `symbols`.
    pub fn native(symbols: Arc<dyn SymbolResolver>) -> Self {
        Self {
            images: Arc::new(ProcMapsEnumerator::default()),
            stack: Arc::new(BacktraceWalker::default()),
            memory: Arc::new(ProcMemReader::default()),
            symbols,
        }
    }

    /// Native capabilities with a custom stack depth limit.
    pub fn native_with_depth(symbols: Arc<dyn SymbolResolver>, max_depth: usize) -> Self {
        Self {
            stack: Arc::new(BacktraceWalker::new(max_depth)),
            ..Self::native(symbols)
        }
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
