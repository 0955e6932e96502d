//! Statement nodes.

use crate::ast::operators::AssignOp;
use crate::ast::ty::ParsedType;
use crate::{Name, Span};

use super::{ExprId, StmtId};

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

/// One `case` of a `match` statement. `pattern` of `None` is the
/// default arm (`_ => ...`), allowed at most once and only last.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchArm {
    pub pattern: Option<ExprId>,
    pub body: StmtId,
    pub span: Span,
}

/// `++` / `--`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IncDecOp {
    Increment,
    Decrement,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// A bare `;`.
    Empty,
    /// `{ ... }` — introduces a scope with its own destructor drain.
    Compound(Vec<StmtId>),
    Expr(ExprId),
    Return(Option<ExprId>),
    /// `var [mutable] name[: T] [= init];`
    VarDef {
        name: Name,
        is_mutable: bool,
        ty: Option<ParsedType>,
        init: Option<ExprId>,
    },
    Assign {
        op: AssignOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    IncDec {
        op: IncDecOp,
        operand: ExprId,
    },
    If {
        cond: ExprId,
        then_body: StmtId,
        else_body: Option<StmtId>,
    },
    /// Unbounded `loop { ... }`.
    Loop {
        body: StmtId,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        step: Option<StmtId>,
        body: StmtId,
    },
    Match {
        target: ExprId,
        arms: Vec<MatchArm>,
    },
    Break,
    Continue,
}
