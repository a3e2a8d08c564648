//! Error types for pattern compilation and matching.

use std::fmt;

/// An error raised while compiling a pattern.
///
/// Every compile-time failure (syntax error, unterminated literal, unbound
/// variable, invalid repeat bounds, integer overflow, circular variable
/// definitions) is reported through this one type, carrying the original
/// pattern text and the byte offset of the offending construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternError {
    message: String,
    pattern: String,
    offset: usize,
}

impl PatternError {
    pub(crate) fn new(message: impl Into<String>, pattern: impl Into<String>, offset: usize) -> PatternError {
        PatternError {
            message: message.into(),
            pattern: pattern.into(),
            offset,
        }
    }

    /// A human-readable description of what went wrong.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The pattern source text that failed to compile.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Byte offset into [`pattern`](Self::pattern) of the offending construct.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} near offset {} in pattern `{}`",
            self.message, self.offset, self.pattern
        )
    }
}

impl std::error::Error for PatternError {}

/// An error raised while running a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchError {
    /// The wall-clock deadline passed before the match completed.
    Timeout,
    /// A result accessor was called before any successful match.
    NoMatch,
    /// A capture-group index outside the pattern's group range.
    GroupOutOfBounds(usize),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::Timeout => write!(f, "time limit exceeded for pattern match"),
            MatchError::NoMatch => write!(
                f,
                "no match available; did find() or matches() run and return true?"
            ),
            MatchError::GroupOutOfBounds(index) => {
                write!(f, "capture group index {index} is out of bounds")
            }
        }
    }
}

impl std::error::Error for MatchError {}
