//! Parser limits

use crate::error::InternalError;

pub const DEFAULT_MAX_DEPTH: usize = 256;
pub const DEFAULT_MAX_PASSES: usize = 1024;

/// Hard ceilings for the recursive filter passes.
///
/// Running past either one is reported as an [`InternalError`] instead of
/// recursing or looping without bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Nesting depth allowed for groups, negations and method arguments
    pub max_depth: usize,
    /// Rewrite rounds allowed while folding method calls and array accessors
    pub max_passes: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub(crate) fn check_depth(&self, depth: usize, stage: &str) -> Result<(), InternalError> {
        if depth > self.max_depth {
            return Err(InternalError::new(format!(
                "{stage} exceeded the maximum nesting depth of {}",
                self.max_depth
            )));
        }
        Ok(())
    }
}
