//! Stack walking via the `backtrace` crate.

use super::{StackWalker, UnwindError};

/// Default frame limit before a walk is reported as truncated.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Walks the calling thread's stack with `backtrace::trace`.
#[derive(Debug, Clone, Copy)]
pub struct BacktraceWalker {
    max_depth: usize,
}

impl Default for BacktraceWalker {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl BacktraceWalker {
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl StackWalker for BacktraceWalker {
    #[inline(never)]
    fn walk(&self) -> Result<Vec<usize>, UnwindError> {
        let mut frames = Vec::new();
        let mut truncated = false;

        backtrace::trace(|frame| {
            if frames.len() >= self.max_depth {
                truncated = true;
                return false;
            }
            frames.push(frame.ip() as usize);
            true
        });

        if truncated {
            return Err(UnwindError::Truncated {
                limit: self.max_depth,
            });
        }
        check_frames(frames)
    }
}

/// Validate a raw walk.
///
/// Some unwinders end the chain with a single null frame; that one is
/// dropped. A null anywhere else means the walk went through a corrupted
/// frame.
pub(crate) fn check_frames(mut frames: Vec<usize>) -> Result<Vec<usize>, UnwindError> {
    if frames.last() == Some(&0) {
        frames.pop();
    }
    if frames.is_empty() {
        return Err(UnwindError::Empty);
    }
    if let Some(index) = frames.iter().position(|&ip| ip == 0) {
        return Err(UnwindError::NullFrame { index });
    }
    Ok(frames)
}
