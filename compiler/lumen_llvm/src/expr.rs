//! Expression lowering.
//!
//! Every expression lowers to a [`Value`]: the back-end value, its
//! language-level type, and whether it is a mutable location. L-values
//! are recovered by inspecting the instruction that produced a value —
//! a load's pointer operand is the address of the thing loaded.

use std::rc::Rc;

use inkwell::values::{
    BasicMetadataValueEnum, BasicValueEnum, FunctionValue, InstructionOpcode, InstructionValue,
    PointerValue,
};
use inkwell::{FloatPredicate, IntPredicate};
use lumen_ir::ast::{
    BinaryOp, BuiltinKind, BuiltinMacroKind, ExprId, ExprKind, IntLit, ParsedType, UnaryOp,
};
use lumen_ir::{IntLitKind, Name, Span};

use crate::context::{CodegenCx, StmtCtx, Value};
use crate::error::CodegenError;
use crate::scope::SymbolTable;
use crate::types::{equals, promote, Ty};

/// Extract the instruction that produced a value, if any.
fn as_instruction(value: BasicValueEnum<'_>) -> Option<InstructionValue<'_>> {
    match value {
        BasicValueEnum::IntValue(v) => v.as_instruction(),
        BasicValueEnum::FloatValue(v) => v.as_instruction(),
        BasicValueEnum::PointerValue(v) => v.as_instruction(),
        BasicValueEnum::StructValue(v) => v.as_instruction(),
        BasicValueEnum::ArrayValue(v) => v.as_instruction(),
        _ => None,
    }
}

impl<'ctx> CodegenCx<'ctx> {
    /// The pointer a loaded value came from, when the value was
    /// produced by a load instruction.
    pub(crate) fn pointer_behind(&self, value: BasicValueEnum<'ctx>) -> Option<PointerValue<'ctx>> {
        let inst = as_instruction(value)?;
        if inst.get_opcode() != InstructionOpcode::Load {
            return None;
        }
        inst.get_operand(0)?.left().map(|op| op.into_pointer_value())
    }

    /// Unwrap a `Value` that must carry a back-end value (i.e. is not a
    /// call to a `void` function).
    pub(crate) fn basic(
        &self,
        value: &Value<'ctx>,
        span: Span,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        value
            .llvm
            .ok_or_else(|| self.error(span, "void value used in an expression"))
    }

    /// References wrap pointers; load through them so the value can be
    /// used as an operand.
    pub(crate) fn deref_if_ref(
        &self,
        value: Value<'ctx>,
        span: Span,
    ) -> Result<Value<'ctx>, CodegenError> {
        if !value.ty.is_reference() {
            return Ok(value);
        }
        let target_ty = value.ty.strip_ref().clone();
        let ptr = self.basic(&value, span)?.into_pointer_value();
        let loaded = self
            .builder
            .build_load(self.llvm_type(&target_ty)?, ptr, "ref_load")?;
        Ok(Value {
            llvm: Some(loaded),
            ty: target_ty,
            is_mutable: value.is_mutable,
        })
    }

    /// Widen an i1 into the byte-wide boolean representation.
    pub(crate) fn bool_byte(
        &self,
        flag: inkwell::values::IntValue<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let byte = self
            .builder
            .build_int_z_extend(flag, self.llcx.i8_type(), "booltmp")?;
        Ok(Value::new(byte.into(), Ty::BOOL))
    }

    /// Compare a value against its own zero, producing an i1 for
    /// branching.
    pub(crate) fn to_condition(
        &self,
        value: &Value<'ctx>,
        span: Span,
    ) -> Result<inkwell::values::IntValue<'ctx>, CodegenError> {
        if !value.ty.is_integer() {
            return Err(self.error(span, "condition type is incompatible with bool"));
        }
        let int = self.basic(value, span)?.into_int_value();
        Ok(self.builder.build_int_compare(
            IntPredicate::NE,
            int,
            int.get_type().const_zero(),
            "cond",
        )?)
    }

    pub fn lower_expr(
        &self,
        id: ExprId,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let unit = self.unit();
        let expr = unit.arena.expr(id);
        let span = expr.span;

        match &expr.kind {
            ExprKind::Int(IntLit { value, kind }) => {
                let (ty, ll) = match kind {
                    IntLitKind::I32 => (Ty::I32, self.llcx.i32_type().const_int(*value, false)),
                    IntLitKind::U32 => (
                        Ty::Builtin(BuiltinKind::U32),
                        self.llcx.i32_type().const_int(*value, false),
                    ),
                    IntLitKind::I64 => (
                        Ty::Builtin(BuiltinKind::I64),
                        self.llcx.i64_type().const_int(*value, false),
                    ),
                    IntLitKind::U64 => (
                        Ty::Builtin(BuiltinKind::U64),
                        self.llcx.i64_type().const_int(*value, false),
                    ),
                };
                Ok(Value::new(ll.into(), ty))
            }
            ExprKind::Float { value, is_f32 } => {
                if *is_f32 {
                    Ok(Value::new(
                        self.llcx.f32_type().const_float(*value).into(),
                        Ty::Builtin(BuiltinKind::F32),
                    ))
                } else {
                    Ok(Value::new(
                        self.llcx.f64_type().const_float(*value).into(),
                        Ty::Builtin(BuiltinKind::F64),
                    ))
                }
            }
            ExprKind::Bool(b) => Ok(Value::new(
                self.llcx.i8_type().const_int(u64::from(*b), false).into(),
                Ty::BOOL,
            )),
            ExprKind::Char(c) => Ok(Value::new(
                self.llcx.i32_type().const_int(u64::from(*c), false).into(),
                Ty::Builtin(BuiltinKind::Char),
            )),
            ExprKind::Str(contents) => self.lower_string_literal(*contents),
            ExprKind::NullPtr => Ok(Value::new(
                self.ptr_type.const_null().into(),
                Ty::pointer_to(Ty::VOID),
            )),
            ExprKind::Ident(name) => self.lower_ident(*name, span, scope),
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinaryOp::And => self.lower_logical_and(*lhs, *rhs, scope, sctx),
                BinaryOp::Or => self.lower_logical_or(*lhs, *rhs, scope, sctx),
                _ => self.lower_binary(*op, *lhs, *rhs, span, scope, sctx),
            },
            ExprKind::Unary { op, operand } => self.lower_unary(*op, *operand, span, scope, sctx),
            ExprKind::Ref { operand } => {
                let value = self.lower_expr(*operand, scope, sctx)?;
                if value.ty.is_reference() {
                    return Ok(value);
                }
                let basic = self.basic(&value, span)?;
                let ptr = self
                    .pointer_behind(basic)
                    .ok_or_else(|| self.error(span, "cannot take a reference to this expression"))?;
                Ok(Value {
                    llvm: Some(ptr.into()),
                    ty: Ty::Reference(Box::new(value.ty)),
                    is_mutable: value.is_mutable,
                })
            }
            ExprKind::New { ty, args } => self.lower_new(ty, args, span, scope, sctx),
            ExprKind::Delete { operand } => self.lower_delete(*operand, span, scope, sctx),
            ExprKind::Subscript { lhs, index } => {
                self.lower_subscript(*lhs, *index, span, scope, sctx)
            }
            ExprKind::Member { lhs, member } => {
                self.lower_member(*lhs, *member, span, scope, sctx)
            }
            ExprKind::ScopeRes { .. } => Err(self.error(
                span,
                "scope resolution is only meaningful as a call target here",
            )),
            ExprKind::Cast { operand, ty } => self.lower_cast(*operand, ty, span, scope, sctx),
            ExprKind::Pipeline { lhs, rhs } => {
                let piped = self.lower_expr(*lhs, scope, sctx)?;
                let piped = self.deref_if_ref(piped, span)?;
                let unit = self.unit();
                let rhs_expr = unit.arena.expr(*rhs);
                match &rhs_expr.kind {
                    ExprKind::Call { callee, args } => self.lower_call(
                        *callee,
                        args,
                        Some(piped),
                        rhs_expr.span,
                        scope,
                        sctx,
                    ),
                    ExprKind::TemplateCall {
                        callee,
                        template_args,
                        args,
                    } => self.lower_template_call(
                        *callee,
                        template_args,
                        args,
                        Some(piped),
                        rhs_expr.span,
                        scope,
                        sctx,
                    ),
                    _ => Err(self.error(
                        rhs_expr.span,
                        "the right-hand side of '|>' must be a call",
                    )),
                }
            }
            ExprKind::Call { callee, args } => {
                self.lower_call(*callee, args, None, span, scope, sctx)
            }
            ExprKind::TemplateCall {
                callee,
                template_args,
                args,
            } => self.lower_template_call(*callee, template_args, args, None, span, scope, sctx),
            ExprKind::ArrayLit { elements } => self.lower_array_lit(elements, span, scope, sctx),
            ExprKind::ClassLit { ty, inits } => self.lower_class_lit(ty, inits, span, scope, sctx),
            ExprKind::SizeOfType { ty } => {
                let ty = self.create_ty(ty, span)?;
                let size = self.abi_size(&ty)?;
                Ok(Value::new(
                    self.llcx.i64_type().const_int(size, false).into(),
                    Ty::U64,
                ))
            }
            ExprKind::SizeOfExpr { operand } => self.lower_sizeof_expr(*operand, span, scope, sctx),
            ExprKind::BuiltinMacro(kind) => Ok(match kind {
                BuiltinMacroKind::HugeValF => Value::new(
                    self.llcx.f32_type().const_float(f64::INFINITY).into(),
                    Ty::Builtin(BuiltinKind::F32),
                ),
                BuiltinMacroKind::HugeVal => Value::new(
                    self.llcx.f64_type().const_float(f64::INFINITY).into(),
                    Ty::Builtin(BuiltinKind::F64),
                ),
            }),
        }
    }

    /// String literals are UTF-32 arrays, NUL-terminated, interned as
    /// private globals. The value is a `*char` to the first code point.
    fn lower_string_literal(&self, contents: Name) -> Result<Value<'ctx>, CodegenError> {
        let text = self.interner.lookup(contents);
        let i32_ty = self.llcx.i32_type();
        let mut code_points: Vec<_> = text
            .chars()
            .map(|c| i32_ty.const_int(u64::from(c), false))
            .collect();
        code_points.push(i32_ty.const_zero());

        let initializer = i32_ty.const_array(&code_points);
        let global = self.llmod.add_global(
            i32_ty.array_type(code_points.len() as u32),
            None,
            ".str",
        );
        global.set_initializer(&initializer);
        global.set_constant(true);
        global.set_linkage(inkwell::module::Linkage::Private);

        Ok(Value::new(
            global.as_pointer_value().into(),
            Ty::pointer_to(Ty::Builtin(BuiltinKind::Char)),
        ))
    }

    fn lower_ident(
        &self,
        name: Name,
        span: Span,
        scope: &SymbolTable<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let var = scope.get(name).ok_or_else(|| {
            self.error(
                span,
                format!(
                    "unknown variable '{}' referenced",
                    self.interner.lookup(name)
                ),
            )
        })?;
        let loaded = self
            .builder
            .build_load(self.llvm_type(&var.ty)?, var.ptr, self.interner.lookup(name))?;
        Ok(Value {
            llvm: Some(loaded),
            ty: var.ty.clone(),
            is_mutable: var.is_mutable,
        })
    }

    /// Apply the implicit integer promotion so both operands share a
    /// type; returns the promoted operands and the shared type.
    fn promote_operands(
        &self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        span: Span,
    ) -> Result<(Value<'ctx>, Value<'ctx>, Ty), CodegenError> {
        if lhs.ty.is_integer() && rhs.ty.is_integer() {
            let target = promote(&lhs.ty, &rhs.ty)
                .ok_or_else(|| self.error(span, "operands do not share an integer promotion"))?;
            let lhs = self.int_cast(lhs, &target, span)?;
            let rhs = self.int_cast(rhs, &target, span)?;
            return Ok((lhs, rhs, target));
        }
        if !equals(&lhs.ty, &rhs.ty) {
            return Err(self.error(
                span,
                "both operands to a binary operator must be of the same type",
            ));
        }
        let ty = lhs.ty.strip_ref().clone();
        Ok((lhs, rhs, ty))
    }

    /// Integer cast to a target integer type, extending per the
    /// *target's* signedness.
    fn int_cast(
        &self,
        value: Value<'ctx>,
        target: &Ty,
        span: Span,
    ) -> Result<Value<'ctx>, CodegenError> {
        let from_width = value
            .ty
            .int_width()
            .ok_or_else(|| self.error(span, "expected an integer operand"))?;
        let to_width = target
            .int_width()
            .ok_or_else(|| self.error(span, "expected an integer type"))?;
        if from_width == to_width {
            return Ok(Value {
                llvm: value.llvm,
                ty: target.clone(),
                is_mutable: value.is_mutable,
            });
        }
        let int = self.basic(&value, span)?.into_int_value();
        let target_ll = self.llvm_type(target)?.into_int_type();
        let cast =
            self.builder
                .build_int_cast_sign_flag(int, target_ll, target.is_signed(), "promote")?;
        Ok(Value::new(cast.into(), target.clone()))
    }

    fn lower_binary(
        &self,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let lhs = self.lower_expr(lhs, scope, sctx)?;
        let lhs = self.deref_if_ref(lhs, span)?;
        let rhs = self.lower_expr(rhs, scope, sctx)?;
        let rhs = self.deref_if_ref(rhs, span)?;

        if lhs.ty.is_float() || rhs.ty.is_float() {
            return self.lower_float_binary(op, lhs, rhs, span);
        }
        if lhs.ty.is_pointer() && rhs.ty.is_pointer() {
            return self.lower_pointer_compare(op, lhs, rhs, span);
        }

        let (lhs, rhs, ty) = self.promote_operands(lhs, rhs, span)?;
        let a = self.basic(&lhs, span)?.into_int_value();
        let b = self.basic(&rhs, span)?.into_int_value();
        let signed = ty.is_signed();

        let value: BasicValueEnum<'ctx> = match op {
            BinaryOp::Add => self.builder.build_int_add(a, b, "addtmp")?.into(),
            BinaryOp::Sub => self.builder.build_int_sub(a, b, "subtmp")?.into(),
            BinaryOp::Mul => self.builder.build_int_mul(a, b, "multmp")?.into(),
            BinaryOp::Div => {
                if signed {
                    self.builder.build_int_signed_div(a, b, "divtmp")?.into()
                } else {
                    self.builder.build_int_unsigned_div(a, b, "divtmp")?.into()
                }
            }
            BinaryOp::Rem => {
                if signed {
                    self.builder.build_int_signed_rem(a, b, "remtmp")?.into()
                } else {
                    self.builder.build_int_unsigned_rem(a, b, "remtmp")?.into()
                }
            }
            BinaryOp::BitAnd => self.builder.build_and(a, b, "andtmp")?.into(),
            BinaryOp::BitOr => self.builder.build_or(a, b, "ortmp")?.into(),
            BinaryOp::Shl => self.builder.build_left_shift(a, b, "shltmp")?.into(),
            BinaryOp::Shr => self
                .builder
                .build_right_shift(a, b, signed, "shrtmp")?
                .into(),
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge => {
                let predicate = int_predicate(op, signed);
                let flag = self.builder.build_int_compare(predicate, a, b, "cmptmp")?;
                return self.bool_byte(flag);
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit ops handled separately"),
        };

        Ok(Value::new(value, ty))
    }

    fn lower_float_binary(
        &self,
        op: BinaryOp,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        span: Span,
    ) -> Result<Value<'ctx>, CodegenError> {
        if !equals(&lhs.ty, &rhs.ty) {
            return Err(self.error(
                span,
                "both operands to a binary operator must be of the same type",
            ));
        }
        let ty = lhs.ty.strip_ref().clone();
        let a = self.basic(&lhs, span)?.into_float_value();
        let b = self.basic(&rhs, span)?.into_float_value();

        let value: BasicValueEnum<'ctx> = match op {
            BinaryOp::Add => self.builder.build_float_add(a, b, "faddtmp")?.into(),
            BinaryOp::Sub => self.builder.build_float_sub(a, b, "fsubtmp")?.into(),
            BinaryOp::Mul => self.builder.build_float_mul(a, b, "fmultmp")?.into(),
            BinaryOp::Div => self.builder.build_float_div(a, b, "fdivtmp")?.into(),
            BinaryOp::Rem => self.builder.build_float_rem(a, b, "fremtmp")?.into(),
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge => {
                let flag =
                    self.builder
                        .build_float_compare(float_predicate(op), a, b, "fcmptmp")?;
                return self.bool_byte(flag);
            }
            _ => return Err(self.error(span, format!("invalid operands to '{op}'"))),
        };

        Ok(Value::new(value, ty))
    }

    fn lower_pointer_compare(
        &self,
        op: BinaryOp,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        span: Span,
    ) -> Result<Value<'ctx>, CodegenError> {
        if !matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            return Err(self.error(span, format!("invalid operands to '{op}'")));
        }
        let a = self.basic(&lhs, span)?.into_pointer_value();
        let b = self.basic(&rhs, span)?.into_pointer_value();
        let a = self
            .builder
            .build_ptr_to_int(a, self.llcx.i64_type(), "ptrtoint")?;
        let b = self
            .builder
            .build_ptr_to_int(b, self.llcx.i64_type(), "ptrtoint")?;
        let predicate = if matches!(op, BinaryOp::Eq) {
            IntPredicate::EQ
        } else {
            IntPredicate::NE
        };
        let flag = self.builder.build_int_compare(predicate, a, b, "pcmptmp")?;
        self.bool_byte(flag)
    }

    /// `a && b`: evaluate `b` only when `a` is true; join as a boolean
    /// byte.
    fn lower_logical_and(
        &self,
        lhs: ExprId,
        rhs: ExprId,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let unit = self.unit();
        let span = unit.arena.expr(lhs).span;

        let lhs_value = self.lower_expr(lhs, scope, sctx)?;
        let lhs_value = self.deref_if_ref(lhs_value, span)?;
        let cond = self.to_condition(&lhs_value, span)?;

        let rhs_bb = self.append_block(sctx.function, "and_rhs");
        let merge_bb = self.append_block(sctx.function, "and_merge");
        let entry_bb = self
            .current_block()
            .ok_or_else(|| self.error(span, "no insertion point"))?;
        self.builder.build_conditional_branch(cond, rhs_bb, merge_bb)?;

        self.builder.position_at_end(rhs_bb);
        let rhs_value = self.lower_expr(rhs, scope, sctx)?;
        let rhs_value = self.deref_if_ref(rhs_value, span)?;
        let rhs_cond = self.to_condition(&rhs_value, span)?;
        let rhs_byte = self.bool_byte(rhs_cond)?;
        let rhs_exit = self
            .current_block()
            .ok_or_else(|| self.error(span, "no insertion point"))?;
        self.builder.build_unconditional_branch(merge_bb)?;

        self.builder.position_at_end(merge_bb);
        let phi = self.builder.build_phi(self.llcx.i8_type(), "andtmp")?;
        let false_byte = self.llcx.i8_type().const_zero();
        let rhs_basic = self.basic(&rhs_byte, span)?;
        phi.add_incoming(&[(&false_byte, entry_bb), (&rhs_basic, rhs_exit)]);
        Ok(Value::new(phi.as_basic_value(), Ty::BOOL))
    }

    /// `a || b`: evaluate `b` only when `a` is false.
    fn lower_logical_or(
        &self,
        lhs: ExprId,
        rhs: ExprId,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let unit = self.unit();
        let span = unit.arena.expr(lhs).span;

        let lhs_value = self.lower_expr(lhs, scope, sctx)?;
        let lhs_value = self.deref_if_ref(lhs_value, span)?;
        let cond = self.to_condition(&lhs_value, span)?;

        let rhs_bb = self.append_block(sctx.function, "or_rhs");
        let merge_bb = self.append_block(sctx.function, "or_merge");
        let entry_bb = self
            .current_block()
            .ok_or_else(|| self.error(span, "no insertion point"))?;
        self.builder.build_conditional_branch(cond, merge_bb, rhs_bb)?;

        self.builder.position_at_end(rhs_bb);
        let rhs_value = self.lower_expr(rhs, scope, sctx)?;
        let rhs_value = self.deref_if_ref(rhs_value, span)?;
        let rhs_cond = self.to_condition(&rhs_value, span)?;
        let rhs_byte = self.bool_byte(rhs_cond)?;
        let rhs_exit = self
            .current_block()
            .ok_or_else(|| self.error(span, "no insertion point"))?;
        self.builder.build_unconditional_branch(merge_bb)?;

        self.builder.position_at_end(merge_bb);
        let phi = self.builder.build_phi(self.llcx.i8_type(), "ortmp")?;
        let true_byte = self.llcx.i8_type().const_int(1, false);
        let rhs_basic = self.basic(&rhs_byte, span)?;
        phi.add_incoming(&[(&true_byte, entry_bb), (&rhs_basic, rhs_exit)]);
        Ok(Value::new(phi.as_basic_value(), Ty::BOOL))
    }

    fn lower_unary(
        &self,
        op: UnaryOp,
        operand: ExprId,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let value = self.lower_expr(operand, scope, sctx)?;

        match op {
            UnaryOp::Plus => Ok(value),
            UnaryOp::Minus => {
                let value = self.deref_if_ref(value, span)?;
                if value.ty.is_float() {
                    let f = self.basic(&value, span)?.into_float_value();
                    let neg = self.builder.build_float_neg(f, "fnegtmp")?;
                    return Ok(Value::new(neg.into(), value.ty));
                }
                if !value.ty.is_integer() {
                    return Err(self.error(span, "unary '-' requires a numeric operand"));
                }
                // -x is 0 - x.
                let int = self.basic(&value, span)?.into_int_value();
                let zero = int.get_type().const_zero();
                let neg = self.builder.build_int_sub(zero, int, "negtmp")?;
                Ok(Value::new(neg.into(), value.ty))
            }
            UnaryOp::Not => {
                let value = self.deref_if_ref(value, span)?;
                let int = self.basic(&value, span)?.into_int_value();
                let flag = self.builder.build_int_compare(
                    IntPredicate::EQ,
                    int,
                    int.get_type().const_zero(),
                    "nottmp",
                )?;
                self.bool_byte(flag)
            }
            UnaryOp::Deref => self.gen_indirection(value, span),
            UnaryOp::AddrOf => self.gen_address_of(value, span),
        }
    }

    fn gen_address_of(
        &self,
        value: Value<'ctx>,
        span: Span,
    ) -> Result<Value<'ctx>, CodegenError> {
        let basic = self.basic(&value, span)?;
        let ptr = self
            .pointer_behind(basic)
            .ok_or_else(|| self.error(span, "cannot take the address of this expression"))?;
        Ok(Value {
            llvm: Some(ptr.into()),
            ty: Ty::pointer_to(value.ty.strip_ref().clone()),
            is_mutable: value.is_mutable,
        })
    }

    fn gen_indirection(
        &self,
        value: Value<'ctx>,
        span: Span,
    ) -> Result<Value<'ctx>, CodegenError> {
        let value = self.deref_if_ref(value, span)?;
        let pointee = value
            .ty
            .pointee()
            .ok_or_else(|| self.error(span, "unary '*' requires a pointer operand"))?;
        let ptr = self.basic(&value, span)?.into_pointer_value();
        let loaded = self
            .builder
            .build_load(self.llvm_type(&pointee)?, ptr, "dereftmp")?;
        Ok(Value {
            llvm: Some(loaded),
            ty: pointee,
            // Stores through a pointer are always permitted; constness
            // belongs to bindings, not pointees.
            is_mutable: true,
        })
    }

    fn lower_subscript(
        &self,
        lhs: ExprId,
        index: ExprId,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let base = self.lower_expr(lhs, scope, sctx)?;
        let base = self.deref_if_ref(base, span)?;
        let index_value = self.lower_expr(index, scope, sctx)?;
        let index_value = self.deref_if_ref(index_value, span)?;
        if !index_value.ty.is_integer() {
            return Err(self.error(span, "array subscript is not an integer"));
        }
        let idx = self.basic(&index_value, span)?.into_int_value();

        match base.ty.strip_ref().clone() {
            Ty::Array { element, .. } => {
                let array_ptr = self
                    .pointer_behind(self.basic(&base, span)?)
                    .ok_or_else(|| self.error(span, "cannot index a temporary array"))?;
                let zero = self.llcx.i64_type().const_zero();
                let elem_ptr = unsafe {
                    self.builder.build_gep(
                        self.llvm_type(base.ty.strip_ref())?,
                        array_ptr,
                        &[zero, idx],
                        "arrayidx",
                    )?
                };
                let loaded =
                    self.builder
                        .build_load(self.llvm_type(&element)?, elem_ptr, "arrayload")?;
                Ok(Value {
                    llvm: Some(loaded),
                    ty: *element,
                    is_mutable: base.is_mutable,
                })
            }
            Ty::Pointer { .. } => {
                let pointee = base.ty.pointee().unwrap_or(Ty::VOID);
                let ptr = self.basic(&base, span)?.into_pointer_value();
                let elem_ptr = unsafe {
                    self.builder
                        .build_gep(self.llvm_type(&pointee)?, ptr, &[idx], "ptridx")?
                };
                let loaded =
                    self.builder
                        .build_load(self.llvm_type(&pointee)?, elem_ptr, "ptrload")?;
                Ok(Value {
                    llvm: Some(loaded),
                    ty: pointee,
                    is_mutable: true,
                })
            }
            _ => Err(self.error(span, "subscripted value is not an array or pointer")),
        }
    }

    pub(crate) fn lower_member(
        &self,
        lhs: ExprId,
        member: Name,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let base = self.lower_expr(lhs, scope, sctx)?;
        let base = self.deref_if_ref(base, span)?;
        let (class, base_ptr, base_mutable) = self.class_base(&base, span)?;

        let idx = class.field_index(member).ok_or_else(|| {
            self.error(
                span,
                format!(
                    "class '{}' has no member named '{}'",
                    self.interner.lookup(class.qualified),
                    self.interner.lookup(member)
                ),
            )
        })?;
        let field = &class.fields[idx];

        if !field.access.is_externally_accessible() && !self.ns.borrow().contains(class.name) {
            return Err(self.error(
                span,
                format!(
                    "member '{}' of class '{}' is private",
                    self.interner.lookup(member),
                    self.interner.lookup(class.qualified)
                ),
            ));
        }

        let field_ptr = self.builder.build_struct_gep(
            class.ll,
            base_ptr,
            idx as u32,
            self.interner.lookup(member),
        )?;
        let loaded =
            self.builder
                .build_load(self.llvm_type(&field.ty)?, field_ptr, "memberload")?;
        Ok(Value {
            llvm: Some(loaded),
            ty: field.ty.clone(),
            is_mutable: base_mutable,
        })
    }

    /// Resolve a value to its class plus an address to access members
    /// through; works for class values and single-level class pointers
    /// (the implicit `this`).
    pub(crate) fn class_base(
        &self,
        base: &Value<'ctx>,
        span: Span,
    ) -> Result<(Rc<crate::context::ClassType<'ctx>>, PointerValue<'ctx>, bool), CodegenError>
    {
        match base.ty.strip_ref() {
            Ty::UserDefined(name) => {
                let class = self
                    .classes
                    .borrow()
                    .get(self.interner.lookup(*name))
                    .cloned()
                    .ok_or_else(|| self.error(span, "member access on a non-class value"))?;
                let ptr = self
                    .pointer_behind(self.basic(base, span)?)
                    .ok_or_else(|| self.error(span, "cannot access members of a temporary"))?;
                Ok((class, ptr, base.is_mutable))
            }
            Ty::Pointer { pointee, depth: 1 } => {
                if let Ty::UserDefined(name) = pointee.as_ref() {
                    let class = self
                        .classes
                        .borrow()
                        .get(self.interner.lookup(*name))
                        .cloned()
                        .ok_or_else(|| self.error(span, "member access on a non-class pointer"))?;
                    let ptr = self.basic(base, span)?.into_pointer_value();
                    Ok((class, ptr, true))
                } else {
                    Err(self.error(span, "member access on a non-class pointer"))
                }
            }
            _ => Err(self.error(span, "member access on a non-class value")),
        }
    }

    fn lower_cast(
        &self,
        operand: ExprId,
        target: &ParsedType,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let value = self.lower_expr(operand, scope, sctx)?;
        let value = self.deref_if_ref(value, span)?;
        let target_ty = self.create_ty(target, span)?;

        if value.ty.is_integer() && target_ty.is_integer() {
            return self.int_cast(value, &target_ty, span);
        }
        if value.ty.is_pointer() && target_ty.is_pointer() {
            let ptr = self.basic(&value, span)?.into_pointer_value();
            let cast = self
                .builder
                .build_pointer_cast(ptr, self.ptr_type, "ptrcast")?;
            return Ok(Value::new(cast.into(), target_ty));
        }

        Err(self.error(
            span,
            format!("cannot cast to '{}'", target_ty.display(self)),
        ))
    }

    fn lower_sizeof_expr(
        &self,
        operand: ExprId,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let unit = self.unit();
        // A bare identifier may name a type rather than a variable.
        if let ExprKind::Ident(name) = unit.arena.expr(operand).kind {
            if scope.get(name).is_none() {
                let ty = self.create_ty(&ParsedType::UserDefined(name), span)?;
                let size = self.abi_size(&ty)?;
                return Ok(Value::new(
                    self.llcx.i64_type().const_int(size, false).into(),
                    Ty::U64,
                ));
            }
        }
        let value = self.lower_expr(operand, scope, sctx)?;
        let size = self.abi_size(value.ty.strip_ref())?;
        Ok(Value::new(
            self.llcx.i64_type().const_int(size, false).into(),
            Ty::U64,
        ))
    }

    fn lower_array_lit(
        &self,
        elements: &[ExprId],
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        if elements.is_empty() {
            return Err(self.error(span, "array literals cannot be empty"));
        }

        let mut values = Vec::with_capacity(elements.len());
        for &element in elements {
            let value = self.lower_expr(element, scope, sctx)?;
            values.push(self.deref_if_ref(value, span)?);
        }

        let elem_ty = values[0].ty.clone();
        for value in &values[1..] {
            if !equals(&value.ty, &elem_ty) {
                return Err(self.error(span, "array literal elements have mismatched types"));
            }
        }

        let array_ty = Ty::Array {
            element: Box::new(elem_ty.clone()),
            size: values.len() as u64,
        };
        let ll_array = self.llvm_type(&array_ty)?;
        let slot = self.entry_alloca(sctx.function, "arraylit", ll_array)?;
        let zero = self.llcx.i64_type().const_zero();
        for (i, value) in values.iter().enumerate() {
            let idx = self.llcx.i64_type().const_int(i as u64, false);
            let elem_ptr = unsafe {
                self.builder
                    .build_gep(ll_array, slot, &[zero, idx], "arrayinit")?
            };
            self.builder
                .build_store(elem_ptr, self.basic(value, span)?)?;
        }
        let loaded = self.builder.build_load(ll_array, slot, "arraylit")?;
        Ok(Value {
            llvm: Some(loaded),
            ty: array_ty,
            is_mutable: true,
        })
    }

    fn lower_class_lit(
        &self,
        parsed: &ParsedType,
        inits: &[ExprId],
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let ty = self.create_ty(parsed, span)?;
        let Ty::UserDefined(qualified) = &ty else {
            return Err(self.error(span, "brace initialization requires a class type"));
        };
        let class = self
            .classes
            .borrow()
            .get(self.interner.lookup(*qualified))
            .cloned()
            .ok_or_else(|| self.error(span, "brace initialization requires a class type"))?;

        if inits.len() != class.fields.len() {
            return Err(self.error(
                span,
                format!(
                    "class '{}' has {} members but {} initializers were given",
                    self.interner.lookup(class.qualified),
                    class.fields.len(),
                    inits.len()
                ),
            ));
        }

        let slot = self.entry_alloca(sctx.function, "classlit", class.ll.into())?;
        for (idx, &init) in inits.iter().enumerate() {
            let value = self.lower_expr(init, scope, sctx)?;
            let value = self.deref_if_ref(value, span)?;
            let value = self.coerce(value, &class.fields[idx].ty, span)?;
            let field_ptr =
                self.builder
                    .build_struct_gep(class.ll, slot, idx as u32, "classinit")?;
            self.builder
                .build_store(field_ptr, self.basic(&value, span)?)?;
        }
        let loaded = self.builder.build_load(class.ll, slot, "classlit")?;
        Ok(Value {
            llvm: Some(loaded),
            ty,
            is_mutable: true,
        })
    }

    /// Check an actual value against an expected type, applying the
    /// permitted implicit conversions (integer widening; null pointer
    /// to any pointer; reference unwrap).
    pub(crate) fn coerce(
        &self,
        value: Value<'ctx>,
        expected: &Ty,
        span: Span,
    ) -> Result<Value<'ctx>, CodegenError> {
        if equals(&value.ty, expected) {
            return Ok(value);
        }

        // A reference is transparent against its referent.
        if value.ty.is_reference() && equals(value.ty.strip_ref(), expected.strip_ref()) {
            return self.deref_if_ref(value, span);
        }

        // null matches any pointer type.
        if expected.is_pointer() && value.ty == Ty::pointer_to(Ty::VOID) {
            return Ok(Value {
                llvm: value.llvm,
                ty: expected.clone(),
                is_mutable: value.is_mutable,
            });
        }

        // Implicit integer widening, never narrowing.
        if let (Some(from), Some(to)) = (value.ty.int_width(), expected.int_width()) {
            if value.ty.is_integer() && expected.is_integer() && from < to {
                let value = self.deref_if_ref(value, span)?;
                return self.int_cast(value, expected, span);
            }
        }

        Err(self.error(
            span,
            format!(
                "incompatible types: expected '{}', found '{}'",
                expected.display(self),
                value.ty.display(self)
            ),
        ))
    }

    fn lower_new(
        &self,
        parsed: &ParsedType,
        args: &[ExprId],
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let ty = self.create_ty(parsed, span)?;
        if ty.is_void() {
            return Err(self.error(span, "cannot allocate 'void'"));
        }

        let malloc = self.declare_malloc();
        let size = self.abi_size(&ty)?;
        let size_value = self.llcx.i64_type().const_int(size, false);
        let raw = self
            .builder
            .build_call(malloc, &[size_value.into()], "newtmp")?
            .try_as_basic_value()
            .left()
            .ok_or_else(|| self.error(span, "allocation failed to produce a value"))?
            .into_pointer_value();

        if let Ty::UserDefined(qualified) = &ty {
            let class = self
                .classes
                .borrow()
                .get(self.interner.lookup(*qualified))
                .cloned();
            if let Some(class) = class {
                let mut arg_values = Vec::with_capacity(args.len());
                for &arg in args {
                    let value = self.lower_expr(arg, scope, sctx)?;
                    arg_values.push(self.deref_if_ref(value, span)?);
                }
                self.construct_in_place(&class, raw, arg_values, span)?;
            } else if !args.is_empty() {
                return Err(self.error(span, "only class types take constructor arguments"));
            }
        } else if !args.is_empty() {
            return Err(self.error(span, "only class types take constructor arguments"));
        }

        Ok(Value {
            llvm: Some(raw.into()),
            ty: Ty::pointer_to(ty),
            is_mutable: true,
        })
    }

    fn lower_delete(
        &self,
        operand: ExprId,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let value = self.lower_expr(operand, scope, sctx)?;
        let value = self.deref_if_ref(value, span)?;
        let pointee = value
            .ty
            .pointee()
            .ok_or_else(|| self.error(span, "'delete' requires a pointer operand"))?;
        let ptr = self.basic(&value, span)?.into_pointer_value();

        if let Ty::UserDefined(qualified) = &pointee {
            let class = self
                .classes
                .borrow()
                .get(self.interner.lookup(*qualified))
                .cloned();
            if let Some(class) = class {
                self.invoke_destructor_on(&class, ptr)?;
            }
        }

        let free = self.declare_free();
        self.builder.build_call(free, &[ptr.into()], "")?;
        Ok(Value::unit())
    }

    fn declare_malloc(&self) -> FunctionValue<'ctx> {
        self.llmod.get_function("malloc").unwrap_or_else(|| {
            let fn_type = self
                .ptr_type
                .fn_type(&[self.llcx.i64_type().into()], false);
            self.llmod.add_function(
                "malloc",
                fn_type,
                Some(inkwell::module::Linkage::External),
            )
        })
    }

    fn declare_free(&self) -> FunctionValue<'ctx> {
        self.llmod.get_function("free").unwrap_or_else(|| {
            let fn_type = self
                .llcx
                .void_type()
                .fn_type(&[self.ptr_type.into()], false);
            self.llmod
                .add_function("free", fn_type, Some(inkwell::module::Linkage::External))
        })
    }

    /// Emit the call for a resolved function, recording the symbol for
    /// `nodiscard` enforcement.
    pub(crate) fn emit_call(
        &self,
        function: FunctionValue<'ctx>,
        symbol: &str,
        args: &[Value<'ctx>],
        ret_ty: Ty,
        span: Span,
    ) -> Result<Value<'ctx>, CodegenError> {
        let mut metadata: Vec<BasicMetadataValueEnum<'ctx>> = Vec::with_capacity(args.len());
        for arg in args {
            metadata.push(self.basic(arg, span)?.into());
        }
        let call = self.builder.build_call(function, &metadata, "")?;
        *self.last_call.borrow_mut() = Some(symbol.to_owned());

        match call.try_as_basic_value().left() {
            Some(value) => Ok(Value::new(value, ret_ty)),
            None => Ok(Value::unit()),
        }
    }
}

fn int_predicate(op: BinaryOp, signed: bool) -> IntPredicate {
    match (op, signed) {
        (BinaryOp::Eq, _) => IntPredicate::EQ,
        (BinaryOp::Ne, _) => IntPredicate::NE,
        (BinaryOp::Lt, true) => IntPredicate::SLT,
        (BinaryOp::Lt, false) => IntPredicate::ULT,
        (BinaryOp::Gt, true) => IntPredicate::SGT,
        (BinaryOp::Gt, false) => IntPredicate::UGT,
        (BinaryOp::Le, true) => IntPredicate::SLE,
        (BinaryOp::Le, false) => IntPredicate::ULE,
        (BinaryOp::Ge, true) => IntPredicate::SGE,
        (BinaryOp::Ge, false) => IntPredicate::UGE,
        _ => unreachable!("not a comparison operator"),
    }
}

fn float_predicate(op: BinaryOp) -> FloatPredicate {
    match op {
        BinaryOp::Eq => FloatPredicate::OEQ,
        BinaryOp::Ne => FloatPredicate::ONE,
        BinaryOp::Lt => FloatPredicate::OLT,
        BinaryOp::Gt => FloatPredicate::OGT,
        BinaryOp::Le => FloatPredicate::OLE,
        BinaryOp::Ge => FloatPredicate::OGE,
        _ => unreachable!("not a comparison operator"),
    }
}

// Call resolution lives alongside the call sites that use it.
mod calls;
