//! Statement lowering and destructor scheduling.
//!
//! Every compound statement opens a scope: a fresh symbol table merged
//! over its parent and a frame on the scope stack recording class-typed
//! locals in declaration order. Scope exits route through synthesized
//! `destruct` blocks that invoke destructors in reverse declaration
//! order — the normal fallthrough drains one scope, while `ret`,
//! `break`, and `continue` drain every scope between the statement and
//! their target before branching.

use std::rc::Rc;

use inkwell::basic_block::BasicBlock;
use lumen_ir::ast::{AssignOp, IncDecOp, MatchArm, StmtId, StmtKind};
use lumen_ir::{Name, Span};
use tracing::warn;

use crate::context::{CodegenCx, ScopeFrame, StmtCtx, Value};
use crate::error::CodegenError;
use crate::scope::{SymbolTable, Variable};
use crate::types::Ty;

impl<'ctx> CodegenCx<'ctx> {
    /// Lower a statement as the body of a construct that introduces a
    /// scope (function body, `if` branch, loop body, match arm).
    pub(crate) fn lower_scoped_stmt(
        &self,
        id: StmtId,
        parent: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        self.scopes.borrow_mut().push(ScopeFrame::default());
        let mut local = SymbolTable::new();

        let result = self.lower_scope_body(id, parent, &mut local, sctx);

        if result.is_ok() && !self.block_terminated() {
            // Normal exit: this scope's destruct block, then fall
            // through.
            self.emit_scope_destruct(sctx)?;
        }
        self.scopes.borrow_mut().pop();
        result
    }

    fn lower_scope_body(
        &self,
        id: StmtId,
        parent: &SymbolTable<'ctx>,
        local: &mut SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        let unit = self.unit();
        let stmt = unit.arena.stmt(id);

        if let StmtKind::Compound(stmts) = &stmt.kind {
            for &inner in stmts {
                // Terminators cannot sit in the middle of a block;
                // anything after one is unreachable.
                if self.block_terminated() {
                    break;
                }
                self.lower_stmt(inner, parent, local, sctx)?;
            }
            Ok(())
        } else {
            self.lower_stmt(id, parent, local, sctx)
        }
    }

    /// The destruct block for a normal scope exit: drains only the
    /// innermost frame, then control continues in the block.
    fn emit_scope_destruct(&self, sctx: &StmtCtx<'ctx>) -> Result<(), CodegenError> {
        let needs_block = self
            .scopes
            .borrow()
            .last()
            .is_some_and(|frame| !frame.class_locals.is_empty());
        if !needs_block {
            return Ok(());
        }

        let destruct_bb = self.append_block(sctx.function, "destruct");
        self.builder.build_unconditional_branch(destruct_bb)?;
        self.builder.position_at_end(destruct_bb);

        let locals: Vec<Rc<Variable<'ctx>>> = self
            .scopes
            .borrow()
            .last()
            .map(|frame| frame.class_locals.clone())
            .unwrap_or_default();
        self.destroy_locals(&locals)?;
        Ok(())
    }

    /// Branch to `target`, draining destructors of every scope at depth
    /// `from_depth` or deeper first. Used by `ret` (depth 0, target
    /// exit) and `break`/`continue` (loop body depth, loop target).
    fn branch_with_drain(
        &self,
        from_depth: usize,
        target: BasicBlock<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        let doomed: Vec<Vec<Rc<Variable<'ctx>>>> = self
            .scopes
            .borrow()
            .iter()
            .skip(from_depth)
            .rev()
            .map(|frame| frame.class_locals.clone())
            .collect();

        if doomed.iter().all(|locals| locals.is_empty()) {
            self.builder.build_unconditional_branch(target)?;
            return Ok(());
        }

        let destruct_bb = self.append_block(sctx.function, "destruct");
        self.builder.build_unconditional_branch(destruct_bb)?;
        self.builder.position_at_end(destruct_bb);
        for locals in &doomed {
            self.destroy_locals(locals)?;
        }
        self.builder.build_unconditional_branch(target)?;
        Ok(())
    }

    /// Destructor calls for one scope's class-typed locals, reverse
    /// declaration order.
    fn destroy_locals(&self, locals: &[Rc<Variable<'ctx>>]) -> Result<(), CodegenError> {
        for var in locals.iter().rev() {
            if let Ty::UserDefined(qualified) = &var.ty {
                let class = self
                    .classes
                    .borrow()
                    .get(self.interner.lookup(*qualified))
                    .cloned();
                if let Some(class) = class {
                    self.invoke_destructor_on(&class, var.ptr)?;
                }
            }
        }
        Ok(())
    }

    fn lower_stmt(
        &self,
        id: StmtId,
        parent: &SymbolTable<'ctx>,
        local: &mut SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        let unit = self.unit();
        let stmt = unit.arena.stmt(id);
        let span = stmt.span;

        match &stmt.kind {
            StmtKind::Empty => Ok(()),
            StmtKind::Compound(_) => {
                let merged = SymbolTable::merged(parent, local);
                self.lower_scoped_stmt(id, &merged, sctx)
            }
            StmtKind::Expr(expr) => {
                let merged = SymbolTable::merged(parent, local);
                self.last_call.borrow_mut().take();
                let value = self.lower_expr(*expr, &merged, sctx)?;
                if value.llvm.is_some() {
                    if let Some(symbol) = self.last_call.borrow().as_deref() {
                        if self.nodiscard_fns.borrow().contains(symbol) {
                            warn!(
                                "{}",
                                self.error(span, "ignoring return value of 'nodiscard' function")
                            );
                        }
                    }
                }
                Ok(())
            }
            StmtKind::Return(value) => self.lower_return(*value, span, parent, local, sctx),
            StmtKind::VarDef {
                name,
                is_mutable,
                ty,
                init,
            } => self.lower_var_def(*name, *is_mutable, ty.as_ref(), *init, span, parent, local, sctx),
            StmtKind::Assign { op, lhs, rhs } => {
                let merged = SymbolTable::merged(parent, local);
                self.lower_assign(*op, *lhs, *rhs, span, &merged, sctx)
            }
            StmtKind::IncDec { op, operand } => {
                let merged = SymbolTable::merged(parent, local);
                self.lower_inc_dec(*op, *operand, span, &merged, sctx)
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let merged = SymbolTable::merged(parent, local);
                self.lower_if(*cond, *then_body, *else_body, span, &merged, sctx)
            }
            StmtKind::Loop { body } => {
                let merged = SymbolTable::merged(parent, local);
                self.lower_loop(*body, &merged, sctx)
            }
            StmtKind::While { cond, body } => {
                let merged = SymbolTable::merged(parent, local);
                self.lower_while(*cond, *body, span, &merged, sctx)
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => self.lower_for(*init, *cond, *step, *body, span, parent, local, sctx),
            StmtKind::Match { target, arms } => {
                let merged = SymbolTable::merged(parent, local);
                self.lower_match(*target, arms, span, &merged, sctx)
            }
            StmtKind::Break => {
                let target = sctx
                    .break_bb
                    .ok_or_else(|| self.error(span, "'break' outside of a loop"))?;
                self.branch_with_drain(sctx.loop_scope_depth, target, sctx)
            }
            StmtKind::Continue => {
                let target = sctx
                    .continue_bb
                    .ok_or_else(|| self.error(span, "'continue' outside of a loop"))?;
                self.branch_with_drain(sctx.loop_scope_depth, target, sctx)
            }
        }
    }

    fn lower_return(
        &self,
        value: Option<lumen_ir::ast::ExprId>,
        span: Span,
        parent: &SymbolTable<'ctx>,
        local: &mut SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        if let Some(expr) = value {
            if sctx.return_ty.is_void() {
                return Err(self.error(span, "cannot return a value from a 'void' function"));
            }
            let merged = SymbolTable::merged(parent, local);
            let result = self.lower_expr(expr, &merged, sctx)?;
            let result = self.coerce(result, &sctx.return_ty, span).map_err(|_| {
                self.error(span, "incompatible type for result type")
            })?;
            let slot = sctx
                .return_slot
                .ok_or_else(|| self.error(span, "function has no return slot"))?;
            self.builder.build_store(slot, self.basic(&result, span)?)?;
        } else if !sctx.return_ty.is_void() {
            return Err(self.error(span, "non-void function must return a value"));
        }

        self.branch_with_drain(0, sctx.exit_bb, sctx)
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_var_def(
        &self,
        name: Name,
        is_mutable: bool,
        annotated: Option<&lumen_ir::ast::ParsedType>,
        init: Option<lumen_ir::ast::ExprId>,
        span: Span,
        parent: &SymbolTable<'ctx>,
        local: &mut SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        let merged = SymbolTable::merged(parent, local);

        let (ty, init_value) = match (annotated, init) {
            (Some(parsed), init) => {
                let ty = self.create_ty(parsed, span)?;
                let init_value = match init {
                    Some(expr) => {
                        let value = self.lower_expr(expr, &merged, sctx)?;
                        Some(self.coerce(value, &ty, span).map_err(|_| {
                            self.error(span, "invalid initializer type")
                        })?)
                    }
                    None => None,
                };
                (ty, init_value)
            }
            (None, Some(expr)) => {
                let value = self.lower_expr(expr, &merged, sctx)?;
                let value = self.deref_if_ref(value, span)?;
                (value.ty.clone(), Some(value))
            }
            (None, None) => {
                return Err(self.error(span, "type inference requires an initializer"));
            }
        };

        if ty.is_void() {
            return Err(self.error(span, "variable has incomplete type 'void'"));
        }

        let slot = self.entry_alloca(sctx.function, self.interner.lookup(name), self.llvm_type(&ty)?)?;
        if let Some(value) = &init_value {
            self.builder.build_store(slot, self.basic(value, span)?)?;
        }

        let var = Rc::new(Variable::new(slot, ty.clone(), is_mutable));
        if let Ty::UserDefined(qualified) = &ty {
            if self
                .classes
                .borrow()
                .contains_key(self.interner.lookup(*qualified))
            {
                if let Some(frame) = self.scopes.borrow_mut().last_mut() {
                    frame.class_locals.push(Rc::clone(&var));
                }
            }
        }
        local.insert_or_shadow(name, var);
        Ok(())
    }

    /// An assignable expression's address: the expression must lower to
    /// a mutable location (a load from somewhere) or a reference.
    fn assignable(
        &self,
        expr: lumen_ir::ast::ExprId,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(inkwell::values::PointerValue<'ctx>, Ty), CodegenError> {
        let value = self.lower_expr(expr, scope, sctx)?;
        if !value.is_mutable {
            return Err(self.error(span, "assignment of read-only variable"));
        }

        if value.ty.is_reference() {
            let target = value.ty.strip_ref().clone();
            let ptr = self.basic(&value, span)?.into_pointer_value();
            return Ok((ptr, target));
        }

        let basic = self.basic(&value, span)?;
        let ptr = self
            .pointer_behind(basic)
            .ok_or_else(|| self.error(span, "expression is not assignable"))?;
        Ok((ptr, value.ty))
    }

    fn lower_assign(
        &self,
        op: AssignOp,
        lhs: lumen_ir::ast::ExprId,
        rhs: lumen_ir::ast::ExprId,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        let (target_ptr, target_ty) = self.assignable(lhs, span, scope, sctx)?;
        if target_ty.is_void() {
            return Err(self.error(span, "variable has incomplete type 'void'"));
        }

        let rhs_value = self.lower_expr(rhs, scope, sctx)?;
        let rhs_value = self.coerce(rhs_value, &target_ty, span)?;

        match op.binary_op() {
            None => {
                self.builder
                    .build_store(target_ptr, self.basic(&rhs_value, span)?)?;
            }
            Some(binary) => {
                let current = self.builder.build_load(
                    self.llvm_type(&target_ty)?,
                    target_ptr,
                    "compound_load",
                )?;
                let current = Value::mutable(current, target_ty.clone());
                let combined =
                    self.apply_arith(binary, current, rhs_value, span)?;
                self.builder
                    .build_store(target_ptr, self.basic(&combined, span)?)?;
            }
        }
        Ok(())
    }

    /// Arithmetic used by compound assignment and `++`/`--`.
    fn apply_arith(
        &self,
        op: lumen_ir::ast::BinaryOp,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        span: Span,
    ) -> Result<Value<'ctx>, CodegenError> {
        use lumen_ir::ast::BinaryOp;

        if lhs.ty.is_float() {
            let a = self.basic(&lhs, span)?.into_float_value();
            let b = self.basic(&rhs, span)?.into_float_value();
            let out = match op {
                BinaryOp::Add => self.builder.build_float_add(a, b, "faddtmp")?,
                BinaryOp::Sub => self.builder.build_float_sub(a, b, "fsubtmp")?,
                BinaryOp::Mul => self.builder.build_float_mul(a, b, "fmultmp")?,
                BinaryOp::Div => self.builder.build_float_div(a, b, "fdivtmp")?,
                BinaryOp::Rem => self.builder.build_float_rem(a, b, "fremtmp")?,
                _ => return Err(self.error(span, format!("unknown operator '{op}' detected"))),
            };
            return Ok(Value::new(out.into(), lhs.ty));
        }

        if !lhs.ty.is_integer() {
            return Err(self.error(span, format!("invalid operands to '{op}'")));
        }
        let signed = lhs.ty.is_signed();
        let a = self.basic(&lhs, span)?.into_int_value();
        let b = self.basic(&rhs, span)?.into_int_value();
        let out = match op {
            BinaryOp::Add => self.builder.build_int_add(a, b, "addtmp")?,
            BinaryOp::Sub => self.builder.build_int_sub(a, b, "subtmp")?,
            BinaryOp::Mul => self.builder.build_int_mul(a, b, "multmp")?,
            BinaryOp::Div => {
                if signed {
                    self.builder.build_int_signed_div(a, b, "divtmp")?
                } else {
                    self.builder.build_int_unsigned_div(a, b, "divtmp")?
                }
            }
            BinaryOp::Rem => {
                if signed {
                    self.builder.build_int_signed_rem(a, b, "remtmp")?
                } else {
                    self.builder.build_int_unsigned_rem(a, b, "remtmp")?
                }
            }
            _ => return Err(self.error(span, format!("unknown operator '{op}' detected"))),
        };
        Ok(Value::new(out.into(), lhs.ty))
    }

    /// Prefix `++x` / `--x`: read, adjust by one at the operand's
    /// width, store back.
    fn lower_inc_dec(
        &self,
        op: IncDecOp,
        operand: lumen_ir::ast::ExprId,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        let (target_ptr, target_ty) = self.assignable(operand, span, scope, sctx)?;
        if !target_ty.is_integer() {
            return Err(self.error(span, "'++'/'--' require an integer operand"));
        }

        let current =
            self.builder
                .build_load(self.llvm_type(&target_ty)?, target_ptr, "incdec_load")?;
        let current = current.into_int_value();
        let one = current.get_type().const_int(1, false);
        let next = match op {
            IncDecOp::Increment => self.builder.build_int_add(current, one, "inctmp")?,
            IncDecOp::Decrement => self.builder.build_int_sub(current, one, "dectmp")?,
        };
        self.builder.build_store(target_ptr, next)?;
        Ok(())
    }

    fn lower_if(
        &self,
        cond: lumen_ir::ast::ExprId,
        then_body: StmtId,
        else_body: Option<StmtId>,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        let cond_value = self.lower_expr(cond, scope, sctx)?;
        let cond_value = self.deref_if_ref(cond_value, span)?;
        let flag = self.to_condition(&cond_value, span)?;

        let then_bb = self.append_block(sctx.function, "if_then");
        let else_bb = self.append_block(sctx.function, "if_else");
        let merge_bb = self.append_block(sctx.function, "if_merge");

        self.builder.build_conditional_branch(flag, then_bb, else_bb)?;

        self.builder.position_at_end(then_bb);
        self.lower_scoped_stmt(then_body, scope, sctx)?;
        if !self.block_terminated() {
            self.builder.build_unconditional_branch(merge_bb)?;
        }

        self.builder.position_at_end(else_bb);
        if let Some(else_body) = else_body {
            self.lower_scoped_stmt(else_body, scope, sctx)?;
        }
        if !self.block_terminated() {
            self.builder.build_unconditional_branch(merge_bb)?;
        }

        self.builder.position_at_end(merge_bb);
        Ok(())
    }

    fn lower_loop(
        &self,
        body: StmtId,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        let body_bb = self.append_block(sctx.function, "loop_body");
        let end_bb = self.append_block(sctx.function, "loop_end");

        self.builder.build_unconditional_branch(body_bb)?;
        self.builder.position_at_end(body_bb);

        let loop_sctx = StmtCtx {
            break_bb: Some(end_bb),
            continue_bb: Some(body_bb),
            loop_scope_depth: self.scopes.borrow().len(),
            ..sctx.clone()
        };
        self.lower_scoped_stmt(body, scope, &loop_sctx)?;
        if !self.block_terminated() {
            self.builder.build_unconditional_branch(body_bb)?;
        }

        self.builder.position_at_end(end_bb);
        Ok(())
    }

    fn lower_while(
        &self,
        cond: lumen_ir::ast::ExprId,
        body: StmtId,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        let cond_bb = self.append_block(sctx.function, "while_cond");
        let body_bb = self.append_block(sctx.function, "while_body");
        let end_bb = self.append_block(sctx.function, "while_end");

        self.builder.build_unconditional_branch(cond_bb)?;
        self.builder.position_at_end(cond_bb);
        let cond_value = self.lower_expr(cond, scope, sctx)?;
        let cond_value = self.deref_if_ref(cond_value, span)?;
        let flag = self.to_condition(&cond_value, span)?;
        self.builder.build_conditional_branch(flag, body_bb, end_bb)?;

        self.builder.position_at_end(body_bb);
        let loop_sctx = StmtCtx {
            break_bb: Some(end_bb),
            continue_bb: Some(cond_bb),
            loop_scope_depth: self.scopes.borrow().len(),
            ..sctx.clone()
        };
        self.lower_scoped_stmt(body, scope, &loop_sctx)?;
        if !self.block_terminated() {
            self.builder.build_unconditional_branch(cond_bb)?;
        }

        self.builder.position_at_end(end_bb);
        Ok(())
    }

    /// `for` lowers its init clause into the *enclosing* scope, then
    /// behaves as a structured while with a dedicated step block that
    /// `continue` targets.
    #[allow(clippy::too_many_arguments)]
    fn lower_for(
        &self,
        init: Option<StmtId>,
        cond: Option<lumen_ir::ast::ExprId>,
        step: Option<StmtId>,
        body: StmtId,
        span: Span,
        parent: &SymbolTable<'ctx>,
        local: &mut SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        if let Some(init) = init {
            self.lower_stmt(init, parent, local, sctx)?;
        }
        let merged = SymbolTable::merged(parent, local);

        let cond_bb = self.append_block(sctx.function, "for_cond");
        let body_bb = self.append_block(sctx.function, "for_body");
        let step_bb = self.append_block(sctx.function, "for_step");
        let end_bb = self.append_block(sctx.function, "for_end");

        self.builder.build_unconditional_branch(cond_bb)?;
        self.builder.position_at_end(cond_bb);
        match cond {
            Some(cond) => {
                let cond_value = self.lower_expr(cond, &merged, sctx)?;
                let cond_value = self.deref_if_ref(cond_value, span)?;
                let flag = self.to_condition(&cond_value, span)?;
                self.builder.build_conditional_branch(flag, body_bb, end_bb)?;
            }
            None => {
                // No condition: unconditionally true.
                self.builder.build_unconditional_branch(body_bb)?;
            }
        }

        self.builder.position_at_end(body_bb);
        let loop_sctx = StmtCtx {
            break_bb: Some(end_bb),
            continue_bb: Some(step_bb),
            loop_scope_depth: self.scopes.borrow().len(),
            ..sctx.clone()
        };
        self.lower_scoped_stmt(body, &merged, &loop_sctx)?;
        if !self.block_terminated() {
            self.builder.build_unconditional_branch(step_bb)?;
        }

        self.builder.position_at_end(step_bb);
        if let Some(step) = step {
            let mut step_local = SymbolTable::new();
            self.lower_stmt(step, &merged, &mut step_local, sctx)?;
        }
        self.builder.build_unconditional_branch(cond_bb)?;

        self.builder.position_at_end(end_bb);
        Ok(())
    }

    /// Sequential equality tests; first matching arm wins; the default
    /// arm (or the merge) terminates the chain. Matching a union value
    /// compares its tag discriminant.
    fn lower_match(
        &self,
        target: lumen_ir::ast::ExprId,
        arms: &[MatchArm],
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        let target_value = self.lower_expr(target, scope, sctx)?;
        let target_value = self.deref_if_ref(target_value, span)?;

        // A union target matches on its tag field.
        let union_target = match target_value.ty.strip_ref() {
            Ty::UserDefined(qualified) => self
                .unions
                .borrow()
                .get(self.interner.lookup(*qualified))
                .cloned(),
            _ => None,
        };
        let scrutinee = match &union_target {
            Some(_) => self
                .builder
                .build_extract_value(
                    self.basic(&target_value, span)?.into_struct_value(),
                    0,
                    "matchtag",
                )?
                .into_int_value(),
            None => {
                if !target_value.ty.is_integer() {
                    return Err(self.error(span, "match target must be an integer or a union"));
                }
                self.basic(&target_value, span)?.into_int_value()
            }
        };

        let merge_bb = self.append_block(sctx.function, "match_merge");
        let mut default_arm: Option<&MatchArm> = None;

        for arm in arms {
            let Some(pattern) = arm.pattern else {
                default_arm = Some(arm);
                continue;
            };
            if self.block_terminated() {
                break;
            }

            let case_value = match (&union_target, self.resolve_union_pattern(pattern)) {
                (Some(union), Some((pattern_union, idx))) => {
                    if !Rc::ptr_eq(union, &pattern_union) {
                        return Err(self.error(arm.span, "match arm is from a different union"));
                    }
                    self.llcx.i32_type().const_int(idx as u64, false)
                }
                (Some(_), None) => {
                    return Err(self.error(arm.span, "union match arms must name a tag"));
                }
                (None, _) => {
                    let value = self.lower_expr(pattern, scope, sctx)?;
                    let value = self.deref_if_ref(value, arm.span)?;
                    let value = self.coerce(value, target_value.ty.strip_ref(), arm.span)?;
                    self.basic(&value, arm.span)?.into_int_value()
                }
            };

            let body_bb = self.append_block(sctx.function, "match_body");
            let next_bb = self.append_block(sctx.function, "match_next");
            let flag = self.builder.build_int_compare(
                inkwell::IntPredicate::EQ,
                scrutinee,
                case_value,
                "matchcmp",
            )?;
            self.builder.build_conditional_branch(flag, body_bb, next_bb)?;

            self.builder.position_at_end(body_bb);
            self.lower_scoped_stmt(arm.body, scope, sctx)?;
            if !self.block_terminated() {
                self.builder.build_unconditional_branch(merge_bb)?;
            }

            self.builder.position_at_end(next_bb);
        }

        if let Some(default) = default_arm {
            self.lower_scoped_stmt(default.body, scope, sctx)?;
        }
        if !self.block_terminated() {
            self.builder.build_unconditional_branch(merge_bb)?;
        }

        self.builder.position_at_end(merge_bb);
        Ok(())
    }
}
