//! Core types for the integrity gate.

pub mod module;
pub mod stack;
pub mod symbol;
pub mod verdict;

pub use module::{AddressRange, ImageMap, LoadedImage, ModuleRecord, TrustBaseline};
pub use stack::StackAuditResult;
pub use symbol::{DispatchKind, Interception, SymbolCheckResult, SymbolTarget};
pub use verdict::{CheckResult, TrustVerdict};
