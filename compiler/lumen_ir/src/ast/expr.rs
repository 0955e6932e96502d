//! Expression nodes.

use crate::ast::operators::{BinaryOp, UnaryOp};
use crate::ast::ty::ParsedType;
use crate::{Name, Span};

use super::ExprId;

/// Builtin compiler macros usable in expression position.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuiltinMacroKind {
    /// `__builtin_huge_valf` — f32 positive infinity.
    HugeValF,
    /// `__builtin_huge_val` — f64 positive infinity.
    HugeVal,
}

impl BuiltinMacroKind {
    pub fn from_str(s: &str) -> Option<BuiltinMacroKind> {
        match s {
            "__builtin_huge_valf" => Some(BuiltinMacroKind::HugeValF),
            "__builtin_huge_val" => Some(BuiltinMacroKind::HugeVal),
            _ => None,
        }
    }
}

/// An expression with its source span.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

/// Integer literal payload; width/signedness comes from the suffix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IntLit {
    pub value: u64,
    pub kind: crate::IntLitKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Int(IntLit),
    Float { value: f64, is_f32: bool },
    Bool(bool),
    /// Cooked string literal contents.
    Str(Name),
    Char(char),
    NullPtr,
    Ident(Name),
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    /// `ref e` — produce a reference to an assignable operand.
    Ref {
        operand: ExprId,
    },
    /// `new T(args)` — heap allocation plus constructor call.
    New {
        ty: ParsedType,
        args: Vec<ExprId>,
    },
    /// `delete e` — destructor call plus deallocation.
    Delete {
        operand: ExprId,
    },
    Subscript {
        lhs: ExprId,
        index: ExprId,
    },
    /// `lhs.member` — field access; method calls wrap this in `Call`.
    Member {
        lhs: ExprId,
        member: Name,
    },
    /// `lhs::rhs`; `lhs` of `None` means a root-forced `::rhs`.
    ScopeRes {
        lhs: Option<ExprId>,
        rhs: ExprId,
    },
    Cast {
        operand: ExprId,
        ty: ParsedType,
    },
    /// `lhs |> call` — the left value becomes the call's first argument.
    Pipeline {
        lhs: ExprId,
        rhs: ExprId,
    },
    Call {
        callee: ExprId,
        args: Vec<ExprId>,
    },
    /// `callee<T, ...>(args)` — explicit template instantiation call.
    TemplateCall {
        callee: ExprId,
        template_args: Vec<ParsedType>,
        args: Vec<ExprId>,
    },
    /// `[a, b, c]`
    ArrayLit {
        elements: Vec<ExprId>,
    },
    /// `T { a, b }` — positional member initialization without a
    /// constructor.
    ClassLit {
        ty: ParsedType,
        inits: Vec<ExprId>,
    },
    /// `sizeof(T)`
    SizeOfType {
        ty: ParsedType,
    },
    /// `sizeof(e)`
    SizeOfExpr {
        operand: ExprId,
    },
    BuiltinMacro(BuiltinMacroKind),
}
