//! Nesting depth tracking for the recursive descent

use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::ParseErrorKind;

/// Counts open arrays and objects so deeply nested input fails cleanly
/// instead of exhausting the stack
#[derive(Debug, Clone)]
pub struct DepthTracker {
    current_depth: usize,
    max_depth: usize,
}

impl DepthTracker {
    /// Create a depth tracker with a custom limit
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            current_depth: 0,
            max_depth,
        }
    }

    /// Enter a new nesting level (array/object)
    pub fn enter(&mut self) -> Result<(), ParseErrorKind> {
        if self.current_depth >= self.max_depth {
            return Err(ParseErrorKind::DepthLimitExceeded {
                max: self.max_depth,
            });
        }
        self.current_depth += 1;
        Ok(())
    }

    /// Exit a nesting level
    pub fn exit(&mut self) {
        self.current_depth = self.current_depth.saturating_sub(1);
    }

    /// Get current depth
    pub fn current_depth(&self) -> usize {
        self.current_depth
    }

    /// Get the configured limit
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for DepthTracker {
    fn default() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }
}
