//! Expression parsing.
//!
//! Binary precedence, low to high: `||`, `&&`, `|`, `&`, `<< >>`,
//! `== !=`, `< > <= >=`, `+ -`, `* / %`, then unary, postfix
//! (`.` `|>` call `[idx]`), and primary. Assignment is a statement, not
//! an expression.

use lumen_ir::ast::{BinaryOp, BuiltinMacroKind, Expr, ExprId, ExprKind, IntLit, UnaryOp};
use lumen_ir::{Span, TokenKind};

use crate::{ParseError, Parser};

impl Parser<'_> {
    pub(crate) fn parse_expr(&mut self) -> Result<ExprId, ParseError> {
        self.parse_logical_or()
    }

    fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        let span = self
            .arena
            .expr(lhs)
            .span
            .merge(self.arena.expr(rhs).span);
        self.arena
            .alloc_expr(Expr::new(ExprKind::Binary { op, lhs, rhs }, span))
    }

    fn parse_logical_or(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_logical_and()?;
        while self.cursor.eat(&TokenKind::OrOr) {
            let rhs = self.parse_logical_and()?;
            lhs = self.binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_bit_or()?;
        while self.cursor.eat(&TokenKind::AndAnd) {
            let rhs = self.parse_bit_or()?;
            lhs = self.binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_or(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_bit_and()?;
        while self.cursor.check(&TokenKind::Pipe) {
            self.cursor.advance();
            let rhs = self.parse_bit_and()?;
            lhs = self.binary(BinaryOp::BitOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_and(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_shift()?;
        while self.cursor.check(&TokenKind::Amp) {
            self.cursor.advance();
            let rhs = self.parse_shift()?;
            lhs = self.binary(BinaryOp::BitAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_equality()?;
        loop {
            if self.cursor.eat(&TokenKind::Shl) {
                let rhs = self.parse_equality()?;
                lhs = self.binary(BinaryOp::Shl, lhs, rhs);
            } else if self.cursor.is_shift_right() {
                self.cursor.consume_compound();
                let rhs = self.parse_equality()?;
                lhs = self.binary(BinaryOp::Shr, lhs, rhs);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_equality(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = if self.cursor.check(&TokenKind::EqEq) {
                BinaryOp::Eq
            } else if self.cursor.check(&TokenKind::NotEq) {
                BinaryOp::Ne
            } else {
                return Ok(lhs);
            };
            self.cursor.advance();
            let rhs = self.parse_relational()?;
            lhs = self.binary(op, lhs, rhs);
        }
    }

    fn parse_relational(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            if self.cursor.is_greater_equal() {
                self.cursor.consume_compound();
                let rhs = self.parse_additive()?;
                lhs = self.binary(BinaryOp::Ge, lhs, rhs);
                continue;
            }
            let op = if self.cursor.check(&TokenKind::Lt) {
                BinaryOp::Lt
            } else if self.cursor.check(&TokenKind::Le) {
                BinaryOp::Le
            } else if self.cursor.check(&TokenKind::Gt) && !self.cursor.is_shift_right() {
                BinaryOp::Gt
            } else {
                return Ok(lhs);
            };
            self.cursor.advance();
            let rhs = self.parse_additive()?;
            lhs = self.binary(op, lhs, rhs);
        }
    }

    fn parse_additive(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.cursor.check(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.cursor.check(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            self.cursor.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = self.binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.cursor.check(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.cursor.check(&TokenKind::Slash) {
                BinaryOp::Div
            } else if self.cursor.check(&TokenKind::Percent) {
                BinaryOp::Rem
            } else {
                return Ok(lhs);
            };
            self.cursor.advance();
            let rhs = self.parse_unary()?;
            lhs = self.binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<ExprId, ParseError> {
        let start = self.cursor.current_span();

        let op = if self.cursor.check(&TokenKind::Plus) {
            Some(UnaryOp::Plus)
        } else if self.cursor.check(&TokenKind::Minus) {
            Some(UnaryOp::Minus)
        } else if self.cursor.check(&TokenKind::Not) {
            Some(UnaryOp::Not)
        } else if self.cursor.check(&TokenKind::Star) {
            Some(UnaryOp::Deref)
        } else if self.cursor.check(&TokenKind::Amp) {
            Some(UnaryOp::AddrOf)
        } else {
            None
        };
        if let Some(op) = op {
            self.cursor.advance();
            let operand = self.parse_unary()?;
            let span = start.merge(self.arena.expr(operand).span);
            return Ok(self
                .arena
                .alloc_expr(Expr::new(ExprKind::Unary { op, operand }, span)));
        }

        if self.cursor.eat(&TokenKind::Ref) {
            let operand = self.parse_unary()?;
            let span = start.merge(self.arena.expr(operand).span);
            return Ok(self
                .arena
                .alloc_expr(Expr::new(ExprKind::Ref { operand }, span)));
        }

        if self.cursor.eat(&TokenKind::Delete) {
            let operand = self.parse_unary()?;
            let span = start.merge(self.arena.expr(operand).span);
            return Ok(self
                .arena
                .alloc_expr(Expr::new(ExprKind::Delete { operand }, span)));
        }

        if self.cursor.eat(&TokenKind::New) {
            return self.parse_new(start);
        }

        if self.cursor.eat(&TokenKind::SizeOf) {
            return self.parse_sizeof(start);
        }

        self.parse_cast()
    }

    /// `new T(args)` / `new T`.
    fn parse_new(&mut self, start: Span) -> Result<ExprId, ParseError> {
        let ty = self.parse_type()?;
        let mut args = Vec::new();
        if self.cursor.eat(&TokenKind::LParen) {
            args = self.parse_call_args()?;
        }
        let span = start.merge(self.cursor.previous_span());
        Ok(self
            .arena
            .alloc_expr(Expr::new(ExprKind::New { ty, args }, span)))
    }

    /// `sizeof(T)` or `sizeof(expr)`; a parenthesized type wins over an
    /// expression when both would parse.
    fn parse_sizeof(&mut self, start: Span) -> Result<ExprId, ParseError> {
        self.cursor.expect(&TokenKind::LParen)?;

        let snapshot = self.cursor.position();
        if let Ok(ty) = self.parse_type() {
            // A bare identifier could just as well be a variable; leave
            // that case to the expression form, which also resolves
            // type names.
            let ambiguous = matches!(ty, lumen_ir::ast::ParsedType::UserDefined(_));
            if !ambiguous && self.cursor.eat(&TokenKind::RParen) {
                let span = start.merge(self.cursor.previous_span());
                return Ok(self
                    .arena
                    .alloc_expr(Expr::new(ExprKind::SizeOfType { ty }, span)));
            }
        }
        self.cursor.set_position(snapshot);

        let operand = self.parse_expr()?;
        self.cursor.expect(&TokenKind::RParen)?;
        let span = start.merge(self.cursor.previous_span());
        Ok(self
            .arena
            .alloc_expr(Expr::new(ExprKind::SizeOfExpr { operand }, span)))
    }

    /// Postfix `as T` casts bind tighter than any binary operator.
    fn parse_cast(&mut self) -> Result<ExprId, ParseError> {
        let mut operand = self.parse_postfix(true)?;
        while self.cursor.eat(&TokenKind::As) {
            let ty = self.parse_type()?;
            let span = self
                .arena
                .expr(operand)
                .span
                .merge(self.cursor.previous_span());
            operand = self
                .arena
                .alloc_expr(Expr::new(ExprKind::Cast { operand, ty }, span));
        }
        Ok(operand)
    }

    /// Postfix chain: member access, subscript, call, pipeline.
    /// `allow_pipeline` is cleared when parsing a pipeline's right-hand
    /// side so `a |> f() |> g()` associates left.
    pub(crate) fn parse_postfix(&mut self, allow_pipeline: bool) -> Result<ExprId, ParseError> {
        let mut lhs = self.parse_primary()?;

        loop {
            if self.cursor.eat(&TokenKind::Dot) {
                let (member, member_span) = self.cursor.expect_ident()?;
                let span = self.arena.expr(lhs).span.merge(member_span);
                lhs = self
                    .arena
                    .alloc_expr(Expr::new(ExprKind::Member { lhs, member }, span));
            } else if self.cursor.eat(&TokenKind::LBracket) {
                let index = self.parse_expr()?;
                self.cursor.expect(&TokenKind::RBracket)?;
                let span = self
                    .arena
                    .expr(lhs)
                    .span
                    .merge(self.cursor.previous_span());
                lhs = self
                    .arena
                    .alloc_expr(Expr::new(ExprKind::Subscript { lhs, index }, span));
            } else if self.cursor.eat(&TokenKind::LParen) {
                let args = self.parse_call_args()?;
                let span = self
                    .arena
                    .expr(lhs)
                    .span
                    .merge(self.cursor.previous_span());
                lhs = self
                    .arena
                    .alloc_expr(Expr::new(ExprKind::Call { callee: lhs, args }, span));
            } else if allow_pipeline && self.cursor.eat(&TokenKind::PipeGt) {
                let rhs = self.parse_postfix(false)?;
                let span = self.arena.expr(lhs).span.merge(self.arena.expr(rhs).span);
                lhs = self
                    .arena
                    .alloc_expr(Expr::new(ExprKind::Pipeline { lhs, rhs }, span));
            } else {
                return Ok(lhs);
            }
        }
    }

    /// Arguments after a consumed `(`, up to and including `)`.
    pub(crate) fn parse_call_args(&mut self) -> Result<Vec<ExprId>, ParseError> {
        let mut args = Vec::new();
        if self.cursor.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        args.push(self.parse_expr()?);
        while self.cursor.eat(&TokenKind::Comma) {
            args.push(self.parse_expr()?);
        }
        self.cursor.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        let span = self.cursor.current_span();

        match self.cursor.current_kind().clone() {
            TokenKind::Int { value, kind } => {
                self.cursor.advance();
                Ok(self
                    .arena
                    .alloc_expr(Expr::new(ExprKind::Int(IntLit { value, kind }), span)))
            }
            TokenKind::Float { value, is_f32 } => {
                self.cursor.advance();
                Ok(self
                    .arena
                    .alloc_expr(Expr::new(ExprKind::Float { value, is_f32 }, span)))
            }
            TokenKind::Str(name) => {
                self.cursor.advance();
                Ok(self.arena.alloc_expr(Expr::new(ExprKind::Str(name), span)))
            }
            TokenKind::Char(c) => {
                self.cursor.advance();
                Ok(self.arena.alloc_expr(Expr::new(ExprKind::Char(c), span)))
            }
            TokenKind::True => {
                self.cursor.advance();
                Ok(self
                    .arena
                    .alloc_expr(Expr::new(ExprKind::Bool(true), span)))
            }
            TokenKind::False => {
                self.cursor.advance();
                Ok(self
                    .arena
                    .alloc_expr(Expr::new(ExprKind::Bool(false), span)))
            }
            TokenKind::Null => {
                self.cursor.advance();
                Ok(self.arena.alloc_expr(Expr::new(ExprKind::NullPtr, span)))
            }
            TokenKind::LParen => {
                self.cursor.advance();
                let inner = self.parse_expr()?;
                self.cursor.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.cursor.advance();
                let mut elements = Vec::new();
                if !self.cursor.eat(&TokenKind::RBracket) {
                    elements.push(self.parse_expr()?);
                    while self.cursor.eat(&TokenKind::Comma) {
                        elements.push(self.parse_expr()?);
                    }
                    self.cursor.expect(&TokenKind::RBracket)?;
                }
                let span = span.merge(self.cursor.previous_span());
                Ok(self
                    .arena
                    .alloc_expr(Expr::new(ExprKind::ArrayLit { elements }, span)))
            }
            TokenKind::ColonColon => {
                self.cursor.advance();
                let (name, name_span) = self.cursor.expect_ident()?;
                let rhs = self
                    .arena
                    .alloc_expr(Expr::new(ExprKind::Ident(name), name_span));
                let node = self.arena.alloc_expr(Expr::new(
                    ExprKind::ScopeRes { lhs: None, rhs },
                    span.merge(name_span),
                ));
                self.parse_scope_chain(node)
            }
            TokenKind::Ident(name) => {
                self.cursor.advance();
                self.parse_ident_expr(name, span)
            }
            _ => Err(self.cursor.expected("expression")),
        }
    }

    /// Continue an identifier: builtin macro, template call, class
    /// literal, or scope-resolution chain.
    fn parse_ident_expr(&mut self, name: lumen_ir::Name, span: Span) -> Result<ExprId, ParseError> {
        if let Some(kind) = BuiltinMacroKind::from_str(self.cursor.interner().lookup(name)) {
            return Ok(self
                .arena
                .alloc_expr(Expr::new(ExprKind::BuiltinMacro(kind), span)));
        }

        // Speculative template-argument parse: `f<i32>(x)` or
        // `Pair<i32>{a, b}` versus the comparison `f < i32`.
        if self.cursor.check(&TokenKind::Lt) {
            let snapshot = self.cursor.position();
            if let Ok(template_args) = self.parse_template_args() {
                if self.cursor.eat(&TokenKind::LParen) {
                    let callee = self.arena.alloc_expr(Expr::new(ExprKind::Ident(name), span));
                    let args = self.parse_call_args()?;
                    let span = span.merge(self.cursor.previous_span());
                    return Ok(self.arena.alloc_expr(Expr::new(
                        ExprKind::TemplateCall {
                            callee,
                            template_args,
                            args,
                        },
                        span,
                    )));
                }
                if self.cursor.check(&TokenKind::LBrace) {
                    let ty = lumen_ir::ast::ParsedType::Template {
                        name,
                        args: template_args,
                    };
                    return self.parse_class_lit(ty, span);
                }
            }
            self.cursor.set_position(snapshot);
        }

        if self.cursor.check(&TokenKind::LBrace) {
            let ty = lumen_ir::ast::ParsedType::UserDefined(name);
            return self.parse_class_lit(ty, span);
        }

        let node = self.arena.alloc_expr(Expr::new(ExprKind::Ident(name), span));
        self.parse_scope_chain(node)
    }

    /// `a::b::c` — left-nested scope resolutions.
    fn parse_scope_chain(&mut self, mut lhs: ExprId) -> Result<ExprId, ParseError> {
        while self.cursor.eat(&TokenKind::ColonColon) {
            let (name, name_span) = self.cursor.expect_ident()?;
            let rhs = self
                .arena
                .alloc_expr(Expr::new(ExprKind::Ident(name), name_span));
            let span = self.arena.expr(lhs).span.merge(name_span);
            lhs = self
                .arena
                .alloc_expr(Expr::new(ExprKind::ScopeRes { lhs: Some(lhs), rhs }, span));
        }
        Ok(lhs)
    }

    /// `T { a, b }` after the type has been parsed.
    fn parse_class_lit(
        &mut self,
        ty: lumen_ir::ast::ParsedType,
        start: Span,
    ) -> Result<ExprId, ParseError> {
        self.cursor.expect(&TokenKind::LBrace)?;
        let mut inits = Vec::new();
        if !self.cursor.eat(&TokenKind::RBrace) {
            inits.push(self.parse_expr()?);
            while self.cursor.eat(&TokenKind::Comma) {
                inits.push(self.parse_expr()?);
            }
            self.cursor.expect(&TokenKind::RBrace)?;
        }
        let span = start.merge(self.cursor.previous_span());
        Ok(self
            .arena
            .alloc_expr(Expr::new(ExprKind::ClassLit { ty, inits }, span)))
    }
}
