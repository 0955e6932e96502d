//! Parse errors.
//!
//! Each expectation failure produces one error; the parser recovers at
//! a synchronization point and keeps going. The error total is carried
//! in the parse result, never in global state.

use lumen_ir::Span;
use std::fmt;

/// A single expectation failure at a source range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub expected: String,
    pub found: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        ParseError {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for ParseError {}
