//! Recursive-descent parser for the Lumen language.
//!
//! Consumes a `TokenList` and produces a [`TranslationUnit`] plus the
//! arena holding its expression and statement nodes. Expectation
//! failures are collected, the parser synchronizes (next statement
//! boundary or closing brace) and continues; the parse is accepted only
//! if the error list is empty and the whole input was consumed.

mod cursor;
mod error;
pub mod recovery;

mod grammar;

pub use error::ParseError;

use cursor::Cursor;
use lumen_ir::ast::{ExprArena, Item, TranslationUnit};
use lumen_ir::{StringInterner, TokenKind, TokenList};
use recovery::{ITEM_START, STMT_BOUNDARY};

/// Everything one parse produces.
pub struct ParseResult {
    pub unit: TranslationUnit,
    pub arena: ExprArena,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// The parse is usable only when no errors were recorded.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parser state for one translation unit.
pub(crate) struct Parser<'a> {
    pub(crate) cursor: Cursor<'a>,
    pub(crate) arena: ExprArena,
    pub(crate) errors: Vec<ParseError>,
}

/// Parse a whole token stream into a translation unit.
pub fn parse(tokens: &TokenList, interner: &StringInterner) -> ParseResult {
    let mut parser = Parser {
        cursor: Cursor::new(tokens, interner),
        arena: ExprArena::new(),
        errors: Vec::new(),
    };

    let items = parser.parse_items_until_eof();

    ParseResult {
        unit: TranslationUnit { items },
        arena: parser.arena,
        errors: parser.errors,
    }
}

impl Parser<'_> {
    fn parse_items_until_eof(&mut self) -> Vec<Item> {
        let mut items = Vec::new();
        while !self.cursor.is_at_end() {
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize_item();
                }
            }
        }
        items
    }

    /// Skip to the start of the next plausible top-level item.
    fn synchronize_item(&mut self) {
        // Always make progress past the offending token.
        if !self.cursor.is_at_end() {
            self.cursor.advance();
        }
        while !self.cursor.is_at_end() && !ITEM_START.contains(self.cursor.current_kind()) {
            self.cursor.advance();
        }
    }

    /// Skip to the next statement boundary; consumes a `;` so parsing
    /// resumes at the following statement, but stops before `}`.
    pub(crate) fn synchronize_stmt(&mut self) {
        while !STMT_BOUNDARY.contains(self.cursor.current_kind()) {
            self.cursor.advance();
        }
        if self.cursor.check(&TokenKind::Semi) {
            self.cursor.advance();
        }
    }
}

#[cfg(test)]
mod tests;
