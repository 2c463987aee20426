//! # ekyc-guard
//!
//! Runtime integrity gate for identity-verification capture pipelines.
//!
//! A face or document capture is only as trustworthy as the process that
//! produced it. Before each sensitive step the host application asks this
//! crate whether the process has been tampered with, and gets back an
//! advisory verdict it can attach to the transaction or act on.
//!
//! ## Checks
//!
//! - **Symbol integrity** -- has a registered entry point been swizzled,
//!   redirected into another module or inline-patched?
//! - **Module inventory** -- which executable images are loaded, and which
//!   appeared after the trust baseline?
//! - **Call-stack audit** -- is every return address on the current stack
//!   inside a baseline module?
//! - **Environment** -- virtual cameras, simulators, root/jailbreak and
//!   instrumentation toolkits.
//!
//! ## Data Flow
//!
//! ```text
//! Registration (process still trusted)
//!   DispatchTable::register(class, selector, kind, address)
//!   -> recorded address + prologue fingerprint
//!
//! First gate call
//!   ImageEnumerator::enumerate() -> TrustBaseline (captured once)
//!
//! Every gate call
//!   environment probes (enabled toggles only)
//!   + SymbolVerifier::check_target() per sensitive symbol
//!   + CallStackAuditor::check_call_stack()
//!   + ModuleDrift against the baseline
//!   -> TrustVerdict (AND of sub-results) -> audit_line()
//! ```

pub mod auditor;
pub mod config;
pub mod dispatch;
pub mod environment;
pub mod error;
pub mod hash;
pub mod inventory;
pub mod platform;
pub mod policy;
pub mod types;
pub mod verifier;

pub use auditor::CallStackAuditor;
pub use config::GuardConfig;
pub use dispatch::DispatchTable;
pub use environment::{jailbreak_check, EnvironmentProbe, HostEnvironment};
pub use error::{FailureKind, GuardError, Result};
pub use inventory::{capture_baseline, capture_loaded_modules, capture_module_records, loaded_module_names, ModuleDrift};
pub use platform::Platform;
pub use policy::{TrustPolicy, TrustRequest};
pub use types::*;
pub use verifier::SymbolVerifier;
