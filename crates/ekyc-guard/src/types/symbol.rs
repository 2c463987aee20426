//! Symbol integrity result types.

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Type-level vs instance-level dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    Instance,
    Class,
}

impl DispatchKind {
    #[must_use]
    pub const fn from_class_method(is_class_method: bool) -> Self {
        if is_class_method {
            Self::Class
        } else {
            Self::Instance
        }
    }

    #[must_use]
    pub const fn is_class_method(self) -> bool {
        matches!(self, Self::Class)
    }

    /// `+` for class methods, `-` for instance methods.
    #[must_use]
    pub const fn sigil(self) -> char {
        match self {
            Self::Class => '+',
            Self::Instance => '-',
        }
    }
}

/// An entry point the integrating application considers sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolTarget {
    pub class_name: String,
    pub selector: String,
    #[serde(default)]
    pub is_class_method: bool,
}

impl SymbolTarget {
    pub fn new(class_name: impl Into<String>, selector: impl Into<String>, is_class_method: bool) -> Self {
        Self {
            class_name: class_name.into(),
            selector: selector.into(),
            is_class_method,
        }
    }

    /// Check name used in verdicts, e.g. `symbol:-[Camera capture_output]`.
    #[must_use]
    pub fn check_name(&self) -> String {
        format!(
            "symbol:{}[{} {}]",
            DispatchKind::from_class_method(self.is_class_method).sigil(),
            self.class_name,
            self.selector
        )
    }
}

/// The interception mechanism a failed symbol check points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interception {
    /// Implementation pointer exchanged for another function (swizzled)
    PointerReplaced { recorded: usize, live: usize },
    /// Live implementation sits in no loaded image (trampoline or JIT stub)
    UnmappedCode { live: usize },
    /// Live implementation belongs to a different module than the original
    ForeignModule { expected: String, actual: String },
    /// Owning module was not present when the baseline was captured
    UntrustedModule { module: String },
    /// Pointer unchanged but the code bytes were rewritten
    InlinePatch { live: usize },
    /// Code bytes could not be read back for comparison
    UnreadableCode { live: usize, reason: String },
}

impl std::fmt::Display for Interception {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PointerReplaced { recorded, live } => write!(
                f,
                "swizzled: implementation replaced ({live:#x} installed, {recorded:#x} recorded at load)"
            ),
            Self::UnmappedCode { live } => write!(
                f,
                "hooked: implementation {live:#x} lies outside every loaded module (trampoline or generated code)"
            ),
            Self::ForeignModule { expected, actual } => write!(
                f,
                "hooked: implementation resolves into foreign module {actual} (expected {expected})"
            ),
            Self::UntrustedModule { module } => write!(
                f,
                "hooked: implementation module {module} is not in the trusted baseline"
            ),
            Self::InlinePatch { live } => write!(
                f,
                "inline patch: code at {live:#x} no longer matches the fingerprint taken at load"
            ),
            Self::UnreadableCode { live, reason } => write!(
                f,
                "unverifiable: code at {live:#x} could not be read ({reason})"
            ),
        }
    }
}

/// Outcome of one symbol integrity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolCheckResult {
    pub class_name: String,
    pub selector: String,
    pub is_class_method: bool,
    /// `true` when the live implementation matches the trusted one
    pub success: bool,
    /// Human-readable diagnostic, for logs only
    pub message: String,
    /// Failure category, `None` on success
    pub failure: Option<FailureKind>,
    /// Detected mechanism when `failure` is `TamperDetected`
    pub finding: Option<Interception>,
}

impl SymbolCheckResult {
    pub(crate) fn intact(target: &SymbolTarget, message: String) -> Self {
        Self::build(target, true, message, None, None)
    }

    pub(crate) fn not_found(target: &SymbolTarget, message: String) -> Self {
        Self::build(target, false, message, Some(FailureKind::TargetNotFound), None)
    }

    pub(crate) fn tampered(target: &SymbolTarget, finding: Interception) -> Self {
        let message = format!(
            "{}[{} {}] {finding}",
            DispatchKind::from_class_method(target.is_class_method).sigil(),
            target.class_name,
            target.selector
        );
        Self::build(
            target,
            false,
            message,
            Some(FailureKind::TamperDetected),
            Some(finding),
        )
    }

    pub(crate) fn baseline_unavailable(target: &SymbolTarget, message: String) -> Self {
        Self::build(
            target,
            false,
            message,
            Some(FailureKind::BaselineUnavailable),
            None,
        )
    }

    fn build(
        target: &SymbolTarget,
        success: bool,
        message: String,
        failure: Option<FailureKind>,
        finding: Option<Interception>,
    ) -> Self {
        Self {
            class_name: target.class_name.clone(),
            selector: target.selector.clone(),
            is_class_method: target.is_class_method,
            success,
            message,
            failure,
            finding,
        }
    }

    /// Whether the target simply does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.failure == Some(FailureKind::TargetNotFound)
    }

    /// Whether an interception was detected.
    #[must_use]
    pub fn is_tampered(&self) -> bool {
        self.failure == Some(FailureKind::TamperDetected)
    }
}
