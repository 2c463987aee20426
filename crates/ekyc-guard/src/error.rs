//! Error types for the integrity gate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for integrity gate operations.
pub type Result<T> = std::result::Result<T, GuardError>;

/// Errors returned by fallible library operations.
///
/// Check outcomes are never reported through this type: a failed check is a
/// business signal carried inside its result value (see [`FailureKind`]).
#[derive(Error, Debug)]
pub enum GuardError {
    /// The loaded-module inventory could not be captured.
    #[error("module baseline unavailable: {0}")]
    BaselineUnavailable(String),

    /// IO error on a specific path.
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// TOML (de)serialization failed.
    #[error("toml error: {0}")]
    Toml(String),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GuardError {
    /// Wrap an IO error with the path that caused it.
    pub fn io(path: &str, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// Why a check did not pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The requested class or selector does not exist. A caller
    /// configuration error, not a tamper signal.
    TargetNotFound,
    /// A symbol, stack or environment check found an inconsistency.
    TamperDetected,
    /// The module inventory could not be captured.
    BaselineUnavailable,
    /// The call-stack walk could not complete.
    StackUnwindFailure,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TargetNotFound => write!(f, "target not found"),
            Self::TamperDetected => write!(f, "tamper detected"),
            Self::BaselineUnavailable => write!(f, "baseline unavailable"),
            Self::StackUnwindFailure => write!(f, "stack unwind failure"),
        }
    }
}
