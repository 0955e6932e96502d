//! Type annotation parsing.
//!
//! ```text
//! type  := '*' type
//!        | '&' type
//!        | base ('[' INT ']')*
//! base  := BUILTIN | IDENT | IDENT '<' type (',' type)* '>'
//! ```

use lumen_ir::ast::{BuiltinKind, ParsedType};
use lumen_ir::TokenKind;

use crate::{ParseError, Parser};

impl Parser<'_> {
    pub(crate) fn parse_type(&mut self) -> Result<ParsedType, ParseError> {
        if self.cursor.eat(&TokenKind::Star) {
            let pointee = self.parse_type()?;
            return Ok(ParsedType::pointer_to(pointee));
        }

        if self.cursor.eat(&TokenKind::Amp) {
            let referent = self.parse_type()?;
            return Ok(ParsedType::Reference(Box::new(referent)));
        }

        let mut ty = self.parse_base_type()?;

        // Array postfix: `T[3]`, `T[2][3]`.
        while self.cursor.eat(&TokenKind::LBracket) {
            let size = match *self.cursor.current_kind() {
                TokenKind::Int { value, .. } => {
                    self.cursor.advance();
                    value
                }
                _ => return Err(self.cursor.expected("array size")),
            };
            self.cursor.expect(&TokenKind::RBracket)?;
            ty = ParsedType::Array {
                element: Box::new(ty),
                size,
            };
        }

        Ok(ty)
    }

    fn parse_base_type(&mut self) -> Result<ParsedType, ParseError> {
        let (name, _span) = match *self.cursor.current_kind() {
            TokenKind::Ident(name) => {
                let span = self.cursor.current_span();
                self.cursor.advance();
                (name, span)
            }
            _ => return Err(self.cursor.expected("type name")),
        };

        if let Some(kind) = BuiltinKind::from_str(self.cursor.interner().lookup(name)) {
            return Ok(ParsedType::Builtin(kind));
        }

        if self.cursor.check(&TokenKind::Lt) {
            let args = self.parse_template_args()?;
            return Ok(ParsedType::Template { name, args });
        }

        Ok(ParsedType::UserDefined(name))
    }

    /// Parse `'<' type (',' type)* '>'`. The lexer emits `>` one at a
    /// time, so `Vec<Vec<i32>>` closes without special casing.
    pub(crate) fn parse_template_args(&mut self) -> Result<Vec<ParsedType>, ParseError> {
        self.cursor.expect(&TokenKind::Lt)?;
        let mut args = vec![self.parse_type()?];
        while self.cursor.eat(&TokenKind::Comma) {
            args.push(self.parse_type()?);
        }
        self.cursor.expect(&TokenKind::Gt)?;
        Ok(args)
    }
}
