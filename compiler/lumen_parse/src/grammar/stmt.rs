//! Statement parsing.

use lumen_ir::ast::{AssignOp, IncDecOp, MatchArm, ParsedType, Stmt, StmtId, StmtKind};
use lumen_ir::TokenKind;

use crate::{ParseError, Parser};

impl Parser<'_> {
    pub(crate) fn parse_stmt(&mut self) -> Result<StmtId, ParseError> {
        let span = self.cursor.current_span();

        match self.cursor.current_kind() {
            TokenKind::Semi => {
                self.cursor.advance();
                Ok(self.arena.alloc_stmt(Stmt::new(StmtKind::Empty, span)))
            }
            TokenKind::LBrace => self.parse_compound(),
            TokenKind::Ret => self.parse_return(),
            TokenKind::Var => self.parse_var_def(),
            TokenKind::If => self.parse_if(),
            TokenKind::Loop => {
                self.cursor.advance();
                let body = self.parse_stmt()?;
                let span = span.merge(self.arena.stmt(body).span);
                Ok(self
                    .arena
                    .alloc_stmt(Stmt::new(StmtKind::Loop { body }, span)))
            }
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Match => self.parse_match(),
            TokenKind::Break => {
                self.cursor.advance();
                self.cursor.expect(&TokenKind::Semi)?;
                Ok(self.arena.alloc_stmt(Stmt::new(StmtKind::Break, span)))
            }
            TokenKind::Continue => {
                self.cursor.advance();
                self.cursor.expect(&TokenKind::Semi)?;
                Ok(self.arena.alloc_stmt(Stmt::new(StmtKind::Continue, span)))
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let stmt = self.parse_inc_dec()?;
                self.cursor.expect(&TokenKind::Semi)?;
                Ok(stmt)
            }
            _ => {
                let stmt = self.parse_expr_or_assign()?;
                self.cursor.expect(&TokenKind::Semi)?;
                Ok(stmt)
            }
        }
    }

    /// `{ stmt* }` — recovers locally so several statement errors can
    /// be reported from one block.
    pub(crate) fn parse_compound(&mut self) -> Result<StmtId, ParseError> {
        let start = self.cursor.current_span();
        self.cursor.expect(&TokenKind::LBrace)?;

        let mut stmts = Vec::new();
        while !self.cursor.check(&TokenKind::RBrace) && !self.cursor.is_at_end() {
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize_stmt();
                }
            }
        }
        self.cursor.expect(&TokenKind::RBrace)?;

        let span = start.merge(self.cursor.previous_span());
        Ok(self
            .arena
            .alloc_stmt(Stmt::new(StmtKind::Compound(stmts), span)))
    }

    fn parse_return(&mut self) -> Result<StmtId, ParseError> {
        let start = self.cursor.current_span();
        self.cursor.expect(&TokenKind::Ret)?;
        let value = if self.cursor.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.cursor.expect(&TokenKind::Semi)?;
        let span = start.merge(self.cursor.previous_span());
        Ok(self
            .arena
            .alloc_stmt(Stmt::new(StmtKind::Return(value), span)))
    }

    /// `var [mutable] name[: T] [= init];`
    fn parse_var_def(&mut self) -> Result<StmtId, ParseError> {
        let start = self.cursor.current_span();
        self.cursor.expect(&TokenKind::Var)?;
        let is_mutable = self.cursor.eat(&TokenKind::Mutable);
        let (name, _) = self.cursor.expect_ident()?;

        let ty: Option<ParsedType> = if self.cursor.eat(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let init = if self.cursor.eat(&TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.cursor.expect(&TokenKind::Semi)?;
        let span = start.merge(self.cursor.previous_span());
        Ok(self.arena.alloc_stmt(Stmt::new(
            StmtKind::VarDef {
                name,
                is_mutable,
                ty,
                init,
            },
            span,
        )))
    }

    fn parse_if(&mut self) -> Result<StmtId, ParseError> {
        let start = self.cursor.current_span();
        self.cursor.expect(&TokenKind::If)?;
        self.cursor.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.cursor.expect(&TokenKind::RParen)?;
        let then_body = self.parse_stmt()?;
        let else_body = if self.cursor.eat(&TokenKind::Else) {
            Some(self.parse_stmt()?)
        } else {
            None
        };
        let end = else_body.map_or(self.arena.stmt(then_body).span, |s| self.arena.stmt(s).span);
        Ok(self.arena.alloc_stmt(Stmt::new(
            StmtKind::If {
                cond,
                then_body,
                else_body,
            },
            start.merge(end),
        )))
    }

    fn parse_while(&mut self) -> Result<StmtId, ParseError> {
        let start = self.cursor.current_span();
        self.cursor.expect(&TokenKind::While)?;
        self.cursor.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.cursor.expect(&TokenKind::RParen)?;
        let body = self.parse_stmt()?;
        let span = start.merge(self.arena.stmt(body).span);
        Ok(self
            .arena
            .alloc_stmt(Stmt::new(StmtKind::While { cond, body }, span)))
    }

    /// `for (init?; cond?; step?) body` — the init clause is a variable
    /// definition or an assignment; the step clause a prefix `++`/`--`
    /// or an assignment.
    fn parse_for(&mut self) -> Result<StmtId, ParseError> {
        let start = self.cursor.current_span();
        self.cursor.expect(&TokenKind::For)?;
        self.cursor.expect(&TokenKind::LParen)?;

        let init = if self.cursor.eat(&TokenKind::Semi) {
            None
        } else if self.cursor.check(&TokenKind::Var) {
            // Consumes its own trailing ';'.
            Some(self.parse_var_def()?)
        } else {
            let stmt = self.parse_expr_or_assign()?;
            self.cursor.expect(&TokenKind::Semi)?;
            Some(stmt)
        };

        let cond = if self.cursor.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.cursor.expect(&TokenKind::Semi)?;

        let step = if self.cursor.check(&TokenKind::RParen) {
            None
        } else if self.cursor.check(&TokenKind::PlusPlus) || self.cursor.check(&TokenKind::MinusMinus)
        {
            Some(self.parse_inc_dec()?)
        } else {
            Some(self.parse_expr_or_assign()?)
        };
        self.cursor.expect(&TokenKind::RParen)?;

        let body = self.parse_stmt()?;
        let span = start.merge(self.arena.stmt(body).span);
        Ok(self.arena.alloc_stmt(Stmt::new(
            StmtKind::For {
                init,
                cond,
                step,
                body,
            },
            span,
        )))
    }

    /// `match (target) { pat => stmt, ... [_ => stmt] }`
    fn parse_match(&mut self) -> Result<StmtId, ParseError> {
        let start = self.cursor.current_span();
        self.cursor.expect(&TokenKind::Match)?;
        self.cursor.expect(&TokenKind::LParen)?;
        let target = self.parse_expr()?;
        self.cursor.expect(&TokenKind::RParen)?;
        self.cursor.expect(&TokenKind::LBrace)?;

        let mut arms = Vec::new();
        while !self.cursor.check(&TokenKind::RBrace) && !self.cursor.is_at_end() {
            let arm_start = self.cursor.current_span();
            let pattern = if self.is_default_arm() {
                self.cursor.advance();
                None
            } else {
                Some(self.parse_expr()?)
            };
            self.cursor.expect(&TokenKind::FatArrow)?;
            let body = self.parse_stmt()?;
            let span = arm_start.merge(self.arena.stmt(body).span);
            arms.push(MatchArm {
                pattern,
                body,
                span,
            });
            // Optional separator between arms.
            self.cursor.eat(&TokenKind::Comma);
        }
        self.cursor.expect(&TokenKind::RBrace)?;

        let span = start.merge(self.cursor.previous_span());
        Ok(self
            .arena
            .alloc_stmt(Stmt::new(StmtKind::Match { target, arms }, span)))
    }

    fn is_default_arm(&self) -> bool {
        match *self.cursor.current_kind() {
            TokenKind::Ident(name) => self.cursor.interner().lookup(name) == "_",
            _ => false,
        }
    }

    /// Prefix `++x` / `--x`.
    fn parse_inc_dec(&mut self) -> Result<StmtId, ParseError> {
        let start = self.cursor.current_span();
        let op = if self.cursor.eat(&TokenKind::PlusPlus) {
            IncDecOp::Increment
        } else {
            self.cursor.expect(&TokenKind::MinusMinus)?;
            IncDecOp::Decrement
        };
        let operand = self.parse_expr()?;
        let span = start.merge(self.arena.expr(operand).span);
        Ok(self
            .arena
            .alloc_stmt(Stmt::new(StmtKind::IncDec { op, operand }, span)))
    }

    /// An expression statement, or an assignment if an assignment
    /// operator follows the expression. Does not consume the `;`.
    fn parse_expr_or_assign(&mut self) -> Result<StmtId, ParseError> {
        let start = self.cursor.current_span();
        let lhs = self.parse_expr()?;

        let op = match self.cursor.current_kind() {
            TokenKind::Eq => Some(AssignOp::Assign),
            TokenKind::PlusEq => Some(AssignOp::AddAssign),
            TokenKind::MinusEq => Some(AssignOp::SubAssign),
            TokenKind::StarEq => Some(AssignOp::MulAssign),
            TokenKind::SlashEq => Some(AssignOp::DivAssign),
            TokenKind::PercentEq => Some(AssignOp::RemAssign),
            _ => None,
        };

        if let Some(op) = op {
            self.cursor.advance();
            let rhs = self.parse_expr()?;
            let span = start.merge(self.arena.expr(rhs).span);
            return Ok(self
                .arena
                .alloc_stmt(Stmt::new(StmtKind::Assign { op, lhs, rhs }, span)));
        }

        let span = start.merge(self.arena.expr(lhs).span);
        Ok(self.arena.alloc_stmt(Stmt::new(StmtKind::Expr(lhs), span)))
    }
}
