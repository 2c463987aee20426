//! Call-stack audit -- is foreign code on the current thread's stack?
//!
//! Code injected after the baseline was captured (library injection,
//! patched memory, generated trampolines) shows up either as a return
//! address inside a module the baseline never saw, or as one inside no
//! module at all.

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::FailureKind;
use crate::platform::{ImageEnumerator, Platform, StackWalker};
use crate::types::StackAuditResult;

/// At most this many unattributed frames are spelled out in the message.
const MAX_LISTED_FRAMES: usize = 8;

/// Attributes return addresses to baseline modules.
pub struct CallStackAuditor<'a> {
    images: &'a dyn ImageEnumerator,
    stack: &'a dyn StackWalker,
}

impl<'a> CallStackAuditor<'a> {
    pub fn new(images: &'a dyn ImageEnumerator, stack: &'a dyn StackWalker) -> Self {
        Self { images, stack }
    }

    pub fn from_platform(platform: &'a Platform) -> Self {
        Self::new(platform.images.as_ref(), platform.stack.as_ref())
    }

    /// Audit the calling thread's stack against `baseline`.
    ///
    /// Unwind and inventory failures are reported as failed audits.
    pub fn check_call_stack(&self, baseline: &BTreeSet<String>) -> StackAuditResult {
        let frames = match self.stack.walk() {
            Ok(frames) => frames,
            Err(e) => {
                warn!(error = %e, "call stack could not be walked");
                return StackAuditResult::error(
                    FailureKind::StackUnwindFailure,
                    format!("stack unwind failed: {e}"),
                );
            }
        };

        let images = match self.images.enumerate() {
            Ok(map) => map,
            Err(e) => {
                return StackAuditResult::error(
                    FailureKind::BaselineUnavailable,
                    format!("cannot attribute frames: {e}"),
                );
            }
        };

        let mut unattributed = Vec::new();
        let mut details = Vec::new();
        for &ip in &frames {
            match images.owner_of_return_address(ip) {
                Some(owner) if baseline.contains(&owner.name) => {}
                Some(owner) => {
                    unattributed.push(ip);
                    details.push(format!("{ip:#x} in {} (not in baseline)", owner.name));
                }
                None => {
                    unattributed.push(ip);
                    details.push(format!("{ip:#x} (no module)"));
                }
            }
        }

        if unattributed.is_empty() {
            return StackAuditResult::clean(frames.len());
        }

        warn!(
            frames = frames.len(),
            unattributed = unattributed.len(),
            "foreign code on call stack"
        );

        let mut message = format!(
            "{} of {} frames unattributed: {}",
            unattributed.len(),
            frames.len(),
            details
                .iter()
                .take(MAX_LISTED_FRAMES)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
        if details.len() > MAX_LISTED_FRAMES {
            message.push_str(&format!(", ... {} more", details.len() - MAX_LISTED_FRAMES));
        }

        StackAuditResult {
            success: false,
            message,
            unattributed_frames: unattributed,
            frames_examined: frames.len(),
            failure: Some(FailureKind::TamperDetected),
        }
    }
}
