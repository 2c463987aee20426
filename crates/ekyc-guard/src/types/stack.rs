//! Call-stack audit result type.

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Outcome of one call-stack audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackAuditResult {
    /// `true` when every frame belongs to a baseline module
    pub success: bool,
    /// Human-readable diagnostic, for logs only
    pub message: String,
    /// Return addresses that could not be attributed, in stack order
    pub unattributed_frames: Vec<usize>,
    /// How many frames were walked
    pub frames_examined: usize,
    /// Failure category, `None` on success
    pub failure: Option<FailureKind>,
}

impl StackAuditResult {
    pub(crate) fn clean(frames_examined: usize) -> Self {
        Self {
            success: true,
            message: format!("{frames_examined} frames, all attributed to baseline modules"),
            unattributed_frames: Vec::new(),
            frames_examined,
            failure: None,
        }
    }

    pub(crate) fn error(failure: FailureKind, message: String) -> Self {
        Self {
            success: false,
            message,
            unattributed_frames: Vec::new(),
            frames_examined: 0,
            failure: Some(failure),
        }
    }
}
