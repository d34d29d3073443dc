//! Masked trace comparison.
//!
//! Compares a golden reference trace against an emulator trace line by line.
//! Reference lines may carry wildcard characters that match anything in the
//! emulator line at the same offset. Comparison is strictly positional and
//! stops at the first line that fails.
//!
//! This crate does no I/O. Obtaining the two sequences is the caller's job.

mod compare;

pub use compare::*;

use std::fmt;

/// Default wildcard character in reference lines.
pub const WILDCARD: char = '_';

/// Character used to right-pad the shorter line of a pair.
pub const PAD: char = ' ';

/// Which character in an expected line means "don't care".
///
/// Only applied to the expected side. A wildcard character in the actual
/// line is an ordinary character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WildcardPolicy {
    pub wildcard: char,
}

impl WildcardPolicy {
    #[must_use]
    pub const fn new(wildcard: char) -> Self {
        Self { wildcard }
    }

    /// Check a single expected/actual character pair.
    #[must_use]
    pub const fn accepts(&self, expected: char, actual: char) -> bool {
        expected == actual || expected == self.wildcard
    }
}

impl Default for WildcardPolicy {
    fn default() -> Self {
        Self::new(WILDCARD)
    }
}

/// First line at which the two traces disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// Zero-based line index.
    pub index: usize,
    /// Expected line as read (no padding).
    pub expected: String,
    /// Actual line as read, or empty when the actual trace ran out.
    pub actual: String,
    /// True when `actual` is padding past the end of the actual trace.
    pub padded: bool,
    /// Every character offset in the padded pair that failed.
    pub columns: Vec<usize>,
}

/// Result of comparing two traces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Number of lines in the expected trace.
    pub expected_len: usize,
    /// Number of lines in the actual trace.
    pub actual_len: usize,
    /// Lines that matched before the divergence (or all expected lines).
    pub matched: usize,
    /// First mismatching line, if any.
    pub divergence: Option<Divergence>,
}

impl Comparison {
    /// True when every expected line matched.
    #[must_use]
    pub const fn is_match(&self) -> bool {
        self.divergence.is_none()
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.divergence {
            None => write!(f, "{} lines matched", self.matched),
            Some(div) => write!(
                f,
                "divergence at line {} after {} matching lines",
                div.index + 1,
                self.matched
            ),
        }
    }
}
