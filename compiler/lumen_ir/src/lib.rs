//! Shared data shapes for the Lumen compiler.
//!
//! This crate holds everything the pipeline stages exchange: spans, the
//! string interner, the token model, the arena-allocated AST, and the
//! position cache used for diagnostics.

pub mod ast;
mod interner;
mod source_map;
mod span;
mod token;

pub use interner::{Name, StringInterner};
pub use source_map::{LineCol, SourceMap};
pub use span::Span;
pub use token::{IntLitKind, Token, TokenKind, TokenList};
