//! Token cursor for navigating the token stream.

use crate::ParseError;
use lumen_ir::{Name, Span, StringInterner, Token, TokenKind, TokenList};

/// Cursor over a [`TokenList`] with one-token lookahead.
///
/// The position is always valid: the last token is `Eof` and the cursor
/// never advances past it.
pub struct Cursor<'a> {
    tokens: &'a TokenList,
    interner: &'a StringInterner,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a TokenList, interner: &'a StringInterner) -> Self {
        Cursor {
            tokens,
            interner,
            pos: 0,
        }
    }

    pub fn interner(&self) -> &'a StringInterner {
        self.interner
    }

    /// Current position, for snapshot/restore during speculative
    /// parsing.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Restore a position previously obtained from [`Cursor::position`].
    pub fn set_position(&mut self, pos: usize) {
        debug_assert!(pos < self.tokens.len(), "cursor position out of bounds");
        self.pos = pos;
    }

    #[inline]
    pub fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    #[inline]
    pub fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    #[inline]
    pub fn current_span(&self) -> Span {
        self.current().span
    }

    pub fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::DUMMY
        }
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.current_kind().tag() == TokenKind::TAG_EOF
    }

    /// Check the current token against a kind by discriminant, ignoring
    /// payloads.
    #[inline]
    pub fn check(&self, kind: &TokenKind) -> bool {
        self.current_kind().tag() == kind.tag()
    }

    #[inline]
    pub fn check_ident(&self) -> bool {
        self.current_kind().tag() == TokenKind::TAG_IDENT
    }

    /// Advance unless at `Eof`.
    pub fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Consume the current token if it matches.
    pub fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of the given kind or report an expectation
    /// failure. Returns the consumed token's span.
    pub fn expect(&mut self, kind: &TokenKind) -> Result<Span, ParseError> {
        if self.check(kind) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.expected(kind.describe()))
        }
    }

    /// Consume an identifier or report an expectation failure.
    pub fn expect_ident(&mut self) -> Result<(Name, Span), ParseError> {
        match *self.current_kind() {
            TokenKind::Ident(name) => {
                let span = self.current_span();
                self.advance();
                Ok((name, span))
            }
            _ => Err(self.expected("identifier")),
        }
    }

    /// Build an expectation-failure error at the current token.
    pub fn expected(&self, what: impl Into<String>) -> ParseError {
        ParseError::new(what, self.current_kind().describe(), self.current_span())
    }

    pub fn peek_next_kind(&self) -> &TokenKind {
        static EOF: TokenKind = TokenKind::Eof;
        self.tokens
            .get(self.pos + 1)
            .map_or(&EOF, |t| &t.kind)
    }

    fn peek_next_span(&self) -> Span {
        self.tokens
            .get(self.pos + 1)
            .map_or(Span::DUMMY, |t| t.span)
    }

    fn current_and_next_adjacent(&self) -> bool {
        self.current_span().end == self.peek_next_span().start
    }

    /// `>` followed immediately by `>`: the `>>` shift operator. Lexed
    /// as two tokens so nested template argument lists close.
    pub fn is_shift_right(&self) -> bool {
        self.check(&TokenKind::Gt)
            && self.peek_next_kind().tag() == TokenKind::Gt.tag()
            && self.current_and_next_adjacent()
    }

    /// `>` followed immediately by `=`: the `>=` comparison operator.
    pub fn is_greater_equal(&self) -> bool {
        self.check(&TokenKind::Gt)
            && self.peek_next_kind().tag() == TokenKind::Eq.tag()
            && self.current_and_next_adjacent()
    }

    /// Consume two adjacent tokens as a compound operator, returning
    /// the combined span.
    pub fn consume_compound(&mut self) -> Span {
        let start = self.current_span();
        self.advance();
        let end = self.current_span();
        self.advance();
        start.merge(end)
    }
}
