//! Abstract syntax tree.
//!
//! Expression and statement nodes live in a per-unit [`ExprArena`] and
//! are referenced by integer ids, assigned at parse time. The ids serve
//! as the stable node identity the position side-computation and the
//! template registries key on; self-referential variants need no boxing
//! because children are ids, not owned nodes.

mod expr;
mod item;
mod operators;
mod stmt;
mod ty;

pub use expr::{BuiltinMacroKind, Expr, ExprKind, IntLit};
pub use item::{
    Accessibility, AttrSet, ClassDef, ClassMember, FieldDef, FunctionDecl, FunctionDef, Item,
    ItemKind, Param, ParamList, TranslationUnit, UnionDef, UnionTag,
    CLASS_DEFAULT_ACCESSIBILITY,
};
pub use operators::{AssignOp, BinaryOp, UnaryOp};
pub use stmt::{IncDecOp, MatchArm, Stmt, StmtKind};
pub use ty::{BuiltinKind, ParsedType};

/// Handle to an expression in an [`ExprArena`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a statement in an [`ExprArena`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StmtId(u32);

impl StmtId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owned storage for one translation unit's expression and statement
/// nodes. Indices are stable: nodes are only ever appended.
#[derive(Debug, Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
}

impl ExprArena {
    pub fn new() -> Self {
        ExprArena::default()
    }

    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = u32::try_from(self.exprs.len())
            .unwrap_or_else(|_| panic!("expression arena capacity exceeded"));
        self.exprs.push(expr);
        ExprId(id)
    }

    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = u32::try_from(self.stmts.len())
            .unwrap_or_else(|_| panic!("statement arena capacity exceeded"));
        self.stmts.push(stmt);
        StmtId(id)
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;

    #[test]
    fn arena_ids_are_stable() {
        let mut arena = ExprArena::new();
        let a = arena.alloc_expr(Expr::new(ExprKind::Bool(true), Span::DUMMY));
        let b = arena.alloc_expr(Expr::new(ExprKind::Bool(false), Span::DUMMY));
        assert_ne!(a, b);
        assert_eq!(arena.expr(a).kind, ExprKind::Bool(true));
        assert_eq!(arena.expr(b).kind, ExprKind::Bool(false));
    }
}
