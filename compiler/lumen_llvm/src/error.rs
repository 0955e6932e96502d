//! Error taxonomy for the middle-end and driver.
//!
//! Parse errors are batched and counted; a codegen error aborts the
//! current translation unit immediately; back-end and I/O failures are
//! not recoverable for the unit.

use std::fmt;
use std::path::PathBuf;

/// A semantic or lowering failure, already formatted with
/// `file:line:col`, the offending source line, and a caret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodegenError {
    pub message: String,
}

impl CodegenError {
    pub fn new(message: impl Into<String>) -> Self {
        CodegenError {
            message: message.into(),
        }
    }
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CodegenError {}

impl From<inkwell::builder::BuilderError> for CodegenError {
    fn from(err: inkwell::builder::BuilderError) -> Self {
        CodegenError::new(format!("instruction builder failure: {err}"))
    }
}

/// Anything that can stop one `compile` call.
#[derive(Debug)]
pub enum CompileError {
    /// Expectation failures, already rendered; `count` is the total
    /// reported to the user.
    Parse {
        file: PathBuf,
        count: usize,
        messages: Vec<String>,
    },
    Codegen(CodegenError),
    /// Verification, emission, or JIT failure in the back end.
    Backend(String),
    Io(std::io::Error),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse { file, count, .. } => {
                write!(f, "{}: {} errors generated", file.display(), count)
            }
            CompileError::Codegen(err) => err.fmt(f),
            CompileError::Backend(msg) => write!(f, "backend error: {msg}"),
            CompileError::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<CodegenError> for CompileError {
    fn from(err: CodegenError) -> Self {
        CompileError::Codegen(err)
    }
}

impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        CompileError::Io(err)
    }
}
