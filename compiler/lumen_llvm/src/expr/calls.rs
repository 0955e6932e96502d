//! Call lowering and symbol resolution.
//!
//! Callees resolve by mangled name under the namespace hierarchy,
//! innermost prefix first. Overloads are distinguished by parameter
//! types: an exact structural match wins, otherwise a unique
//! integer-widening-compatible candidate. `extern`/`nomangle` symbols
//! are found verbatim as a fallback.

use std::rc::Rc;

use inkwell::values::FunctionValue;
use lumen_ir::ast::{Accessibility, ExprId, ExprKind, ParsedType};
use lumen_ir::{Name, Span};

use crate::context::{
    ClassType, CodegenCx, Namespace, NamespaceKind, StmtCtx, UnionType, Value,
};
use crate::error::CodegenError;
use crate::scope::SymbolTable;
use crate::types::{equals, Ty};

impl<'ctx> CodegenCx<'ctx> {
    pub(crate) fn lower_call(
        &self,
        callee: ExprId,
        args: &[ExprId],
        extra_first: Option<Value<'ctx>>,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let unit = self.unit();
        let callee_kind = unit.arena.expr(callee).kind.clone();

        match callee_kind {
            ExprKind::Ident(name) => {
                // A call of a class name is a constructor invocation.
                if let Some(class) = self.find_class(name) {
                    let arg_values = self.lower_args(args, extra_first, scope, sctx)?;
                    return self.construct_class(&class, arg_values, span, sctx);
                }
                let mut arg_values = self.lower_args(args, extra_first, scope, sctx)?;
                let (function, symbol, ret_ty) = self.resolve_function(
                    self.interner.lookup(name),
                    &mut arg_values,
                    span,
                )?;
                self.emit_call(function, &symbol, &arg_values, ret_ty, span)
            }
            ExprKind::Member { lhs, member } => {
                self.lower_method_call(lhs, member, args, extra_first, span, scope, sctx)
            }
            ExprKind::ScopeRes { .. } => {
                self.lower_scoped_call(callee, args, extra_first, span, scope, sctx)
            }
            _ => Err(self.error(span, "expression is not callable")),
        }
    }

    /// Lower call arguments in order, prepending a piped value when the
    /// call is the right-hand side of `|>`.
    fn lower_args(
        &self,
        args: &[ExprId],
        extra_first: Option<Value<'ctx>>,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Vec<Value<'ctx>>, CodegenError> {
        let mut values = Vec::with_capacity(args.len() + 1);
        if let Some(extra) = extra_first {
            values.push(extra);
        }
        for &arg in args {
            values.push(self.lower_expr(arg, scope, sctx)?);
        }
        Ok(values)
    }

    /// Resolve a free function by walking namespace prefixes from the
    /// innermost outward, falling back to the verbatim (unmangled)
    /// symbol for `extern`/`nomangle` functions.
    pub(crate) fn resolve_function(
        &self,
        name: &str,
        args: &mut Vec<Value<'ctx>>,
        span: Span,
    ) -> Result<(FunctionValue<'ctx>, String, Ty), CodegenError> {
        let ns = self.ns.borrow().clone();
        for depth in (0..=ns.len()).rev() {
            let qualified = ns.prefix(depth).qualify(self.interner, name);
            if let Some(hit) = self.find_overload(&qualified, args, span)? {
                return Ok(hit);
            }
        }

        if let Some(function) = self.llmod.get_function(name) {
            let symbol = name.to_owned();
            self.match_verbatim(function, &symbol, args, span)?;
            let ret_ty = self
                .return_types
                .borrow()
                .get(&symbol)
                .cloned()
                .unwrap_or(Ty::VOID);
            return Ok((function, symbol, ret_ty));
        }

        Err(self.error(span, format!("unknown function '{name}' referenced")))
    }

    /// Arity/type validation against an unmangled symbol's signature.
    fn match_verbatim(
        &self,
        function: FunctionValue<'ctx>,
        symbol: &str,
        args: &mut Vec<Value<'ctx>>,
        span: Span,
    ) -> Result<(), CodegenError> {
        let variadic = function.get_type().is_var_arg();
        let fixed = function.count_params() as usize;
        if args.len() < fixed || (!variadic && args.len() != fixed) {
            return Err(self.error(span, "incorrect arguments passed"));
        }
        if let Some(params) = self.param_types.borrow().get(symbol).cloned() {
            self.coerce_args(args, &params, span)?;
        }
        Ok(())
    }

    /// Look for a matching overload under one qualified name. Applies
    /// the chosen candidate's coercions to `args` on success.
    pub(crate) fn find_overload(
        &self,
        qualified: &str,
        args: &mut Vec<Value<'ctx>>,
        span: Span,
    ) -> Result<Option<(FunctionValue<'ctx>, String, Ty)>, CodegenError> {
        let candidates = self
            .overloads
            .borrow()
            .get(qualified)
            .cloned()
            .unwrap_or_default();
        if candidates.is_empty() {
            return Ok(None);
        }

        let pick = |symbol: &String| -> Option<(Vec<Ty>, bool)> {
            let params = self.param_types.borrow().get(symbol).cloned()?;
            let variadic = self.variadic_fns.borrow().contains(symbol);
            Some((params, variadic))
        };

        // Exact structural match first.
        for symbol in &candidates {
            let Some((params, variadic)) = pick(symbol) else {
                continue;
            };
            if self.args_match(args, &params, variadic, false) {
                return Ok(Some(self.commit_overload(symbol, args, &params, span)?));
            }
        }

        // Then a unique widening-compatible candidate.
        let mut compatible = Vec::new();
        for symbol in &candidates {
            let Some((params, variadic)) = pick(symbol) else {
                continue;
            };
            if self.args_match(args, &params, variadic, true) {
                compatible.push((symbol.clone(), params));
            }
        }
        match compatible.len() {
            0 => Ok(None),
            1 => {
                let (symbol, params) = &compatible[0];
                Ok(Some(self.commit_overload(symbol, args, params, span)?))
            }
            _ => Err(self.error(
                span,
                format!("call of '{qualified}' is ambiguous between {} overloads", compatible.len()),
            )),
        }
    }

    fn args_match(&self, args: &[Value<'ctx>], params: &[Ty], variadic: bool, widening: bool) -> bool {
        if args.len() < params.len() || (!variadic && args.len() != params.len()) {
            return false;
        }
        args.iter().zip(params).all(|(arg, param)| {
            if param.is_reference() {
                return arg.ty.is_reference() && equals(&arg.ty, param);
            }
            if equals(&arg.ty, param) {
                return true;
            }
            if param.is_pointer() && arg.ty == Ty::pointer_to(Ty::VOID) {
                return true;
            }
            if widening {
                if let (Some(from), Some(to)) = (arg.ty.int_width(), param.int_width()) {
                    return arg.ty.is_integer() && param.is_integer() && from < to;
                }
            }
            false
        })
    }

    fn commit_overload(
        &self,
        symbol: &str,
        args: &mut Vec<Value<'ctx>>,
        params: &[Ty],
        span: Span,
    ) -> Result<(FunctionValue<'ctx>, String, Ty), CodegenError> {
        self.coerce_args(args, params, span)?;
        let function = self.llmod.get_function(symbol).ok_or_else(|| {
            CodegenError::new(format!("symbol '{symbol}' is registered but not declared"))
        })?;
        let ret_ty = self
            .return_types
            .borrow()
            .get(symbol)
            .cloned()
            .unwrap_or(Ty::VOID);
        Ok((function, symbol.to_owned(), ret_ty))
    }

    /// Coerce fixed arguments to parameter types; variadic extras are
    /// passed through with references unwrapped.
    pub(crate) fn coerce_args(
        &self,
        args: &mut Vec<Value<'ctx>>,
        params: &[Ty],
        span: Span,
    ) -> Result<(), CodegenError> {
        for (i, arg) in args.iter_mut().enumerate() {
            let old = arg.clone();
            *arg = match params.get(i) {
                Some(param) if param.is_reference() => {
                    if !old.ty.is_reference() || !equals(&old.ty, param) {
                        return Err(self.error(
                            span,
                            format!(
                                "incompatible type for argument {} (expected '{}')",
                                i + 1,
                                param.display(self)
                            ),
                        ));
                    }
                    old
                }
                Some(param) => self.coerce(old, param, span)?,
                None => self.deref_if_ref(old, span)?,
            };
        }
        Ok(())
    }

    fn lower_method_call(
        &self,
        lhs: ExprId,
        member: Name,
        args: &[ExprId],
        extra_first: Option<Value<'ctx>>,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let recv = self.lower_expr(lhs, scope, sctx)?;
        let recv = self.deref_if_ref(recv, span)?;
        let (class, this_ptr, _) = self.class_base(&recv, span)?;

        let mut arg_values = vec![Value {
            llvm: Some(this_ptr.into()),
            ty: Ty::pointer_to(Ty::UserDefined(class.qualified)),
            is_mutable: true,
        }];
        arg_values.extend(self.lower_args(args, extra_first, scope, sctx)?);

        let mut path = class.ns.clone();
        path.push(Namespace {
            name: class.name,
            kind: NamespaceKind::Class,
        });
        let qualified = path.qualify(self.interner, self.interner.lookup(member));

        let (function, symbol, ret_ty) = self
            .find_overload(&qualified, &mut arg_values, span)?
            .ok_or_else(|| {
                self.error(
                    span,
                    format!(
                        "class '{}' has no method '{}' matching these arguments",
                        self.interner.lookup(class.qualified),
                        self.interner.lookup(member)
                    ),
                )
            })?;

        let access = self.fn_access.borrow().get(&symbol).copied();
        if access == Some(Accessibility::Private) && !self.ns.borrow().contains(class.name) {
            return Err(self.error(
                span,
                format!(
                    "method '{}' of class '{}' is private",
                    self.interner.lookup(member),
                    self.interner.lookup(class.qualified)
                ),
            ));
        }

        self.emit_call(function, &symbol, &arg_values, ret_ty, span)
    }

    /// `a::b::f(args)` — a namespaced function, a static constructor
    /// call (`Class::new`), or a union tag constructor.
    fn lower_scoped_call(
        &self,
        callee: ExprId,
        args: &[ExprId],
        extra_first: Option<Value<'ctx>>,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let (root, segments) = self
            .flatten_scope_chain(callee)
            .ok_or_else(|| self.error(span, "invalid scope resolution"))?;
        let (last, path) = segments
            .split_last()
            .ok_or_else(|| self.error(span, "invalid scope resolution"))?;

        // Union tag constructor: `U::tag(value)`.
        if let Some((union, tag_idx)) = self.resolve_union_tag_path(root, &segments) {
            let arg_values = self.lower_args(args, extra_first, scope, sctx)?;
            return self.construct_union(&union, tag_idx, arg_values, span, sctx);
        }

        // Arguments are evaluated once; each resolution attempt works
        // on a copy so a failed candidate's coercions never stick.
        let arg_values = self.lower_args(args, extra_first, scope, sctx)?;
        let last_text = self.interner.lookup(*last);

        for stack in self.candidate_stacks(root, path) {
            // `Class::new(...)` constructs like `Class(...)`.
            if last_text == "new" {
                if let Some(&Namespace {
                    name,
                    kind: NamespaceKind::Class,
                }) = stack.iter().last()
                {
                    let qualified = stack
                        .prefix(stack.len() - 1)
                        .qualify(self.interner, self.interner.lookup(name));
                    if let Some(class) = self.classes.borrow().get(qualified.as_str()).cloned() {
                        return self.construct_class(&class, arg_values.clone(), span, sctx);
                    }
                }
            }

            let qualified = stack.qualify(self.interner, last_text);
            let mut attempt = arg_values.clone();
            if let Some((function, symbol, ret_ty)) =
                self.find_overload(&qualified, &mut attempt, span)?
            {
                return self.emit_call(function, &symbol, &attempt, ret_ty, span);
            }
        }

        Err(self.error(
            span,
            format!(
                "unknown function '{}' referenced",
                self.interner.lookup(*last)
            ),
        ))
    }

    /// Flatten `a::b::c` into its segment names. Returns `None` when a
    /// segment is not a plain identifier.
    pub(crate) fn flatten_scope_chain(&self, id: ExprId) -> Option<(bool, Vec<Name>)> {
        let unit = self.unit();
        let mut segments = Vec::new();
        let mut root = false;
        let mut current = Some(id);

        while let Some(node) = current {
            match &unit.arena.expr(node).kind {
                ExprKind::ScopeRes { lhs, rhs } => {
                    let ExprKind::Ident(name) = unit.arena.expr(*rhs).kind else {
                        return None;
                    };
                    segments.push(name);
                    if lhs.is_none() {
                        root = true;
                    }
                    current = *lhs;
                }
                ExprKind::Ident(name) => {
                    segments.push(*name);
                    current = None;
                }
                _ => return None,
            }
        }

        segments.reverse();
        Some((root, segments))
    }

    /// The namespace stacks a scoped path could denote, innermost
    /// current prefix first; a root-forced path tries only the empty
    /// prefix.
    fn candidate_stacks(&self, root: bool, path: &[Name]) -> Vec<crate::context::NamespaceStack> {
        let ns = self.ns.borrow().clone();
        let depths: Vec<usize> = if root {
            vec![0]
        } else {
            (0..=ns.len()).rev().collect()
        };

        let mut stacks = Vec::with_capacity(depths.len());
        for depth in depths {
            let mut stack = ns.prefix(depth);
            for &seg in path {
                let qualified = stack.qualify(self.interner, self.interner.lookup(seg));
                let kind = if self.classes.borrow().contains_key(qualified.as_str()) {
                    NamespaceKind::Class
                } else {
                    NamespaceKind::Namespace
                };
                stack.push(Namespace { name: seg, kind });
            }
            stacks.push(stack);
        }
        stacks
    }

    /// Resolve `U::tag` (possibly namespace-qualified) to a union and a
    /// tag index.
    pub(crate) fn resolve_union_tag_path(
        &self,
        root: bool,
        segments: &[Name],
    ) -> Option<(Rc<UnionType<'ctx>>, usize)> {
        if segments.len() < 2 {
            return None;
        }
        let (tag, path) = segments.split_last()?;
        let path_text = path
            .iter()
            .map(|seg| self.interner.lookup(*seg))
            .collect::<Vec<_>>()
            .join("::");

        let ns = self.ns.borrow().clone();
        let depths: Vec<usize> = if root {
            vec![0]
        } else {
            (0..=ns.len()).rev().collect()
        };
        for depth in depths {
            let qualified = ns.prefix(depth).qualify(self.interner, &path_text);
            if let Some(union) = self.unions.borrow().get(qualified.as_str()).cloned() {
                let idx = union.tag_index(*tag)?;
                return Some((union, idx));
            }
        }
        None
    }

    /// Resolve a match-arm pattern of the form `U::tag` against unions.
    pub(crate) fn resolve_union_pattern(
        &self,
        pattern: ExprId,
    ) -> Option<(Rc<UnionType<'ctx>>, usize)> {
        let (root, segments) = self.flatten_scope_chain(pattern)?;
        self.resolve_union_tag_path(root, &segments)
    }

    fn construct_union(
        &self,
        union: &UnionType<'ctx>,
        tag_idx: usize,
        mut args: Vec<Value<'ctx>>,
        span: Span,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        if args.len() != 1 {
            return Err(self.error(span, "union construction takes exactly one value"));
        }
        let payload_ty = union.tags[tag_idx].1.clone();
        let payload = self.coerce(args.remove(0), &payload_ty, span)?;

        let slot = self.entry_alloca(sctx.function, "uniontmp", union.ll.into())?;
        let tag_ptr = self
            .builder
            .build_struct_gep(union.ll, slot, 0, "uniontag")?;
        self.builder.build_store(
            tag_ptr,
            self.llcx.i32_type().const_int(tag_idx as u64, false),
        )?;
        let payload_ptr = self
            .builder
            .build_struct_gep(union.ll, slot, 1, "unionpayload")?;
        self.builder
            .build_store(payload_ptr, self.basic(&payload, span)?)?;

        let loaded = self.builder.build_load(union.ll, slot, "uniontmp")?;
        Ok(Value {
            llvm: Some(loaded),
            ty: Ty::UserDefined(union.qualified),
            is_mutable: true,
        })
    }

    /// Find a class by unqualified name under the current hierarchy.
    pub(crate) fn find_class(&self, name: Name) -> Option<Rc<ClassType<'ctx>>> {
        let text = self.interner.lookup(name);
        let ns = self.ns.borrow().clone();
        for depth in (0..=ns.len()).rev() {
            let qualified = ns.prefix(depth).qualify(self.interner, text);
            if let Some(class) = self.classes.borrow().get(qualified.as_str()).cloned() {
                return Some(class);
            }
        }
        None
    }

    /// Construct a class value in a fresh stack slot. The temporary is
    /// not registered for scope destruction; ownership passes to
    /// whatever consumes the value.
    pub(crate) fn construct_class(
        &self,
        class: &Rc<ClassType<'ctx>>,
        args: Vec<Value<'ctx>>,
        span: Span,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        if class.is_opaque {
            return Err(self.error(
                span,
                format!(
                    "class '{}' is declared but not defined",
                    self.interner.lookup(class.qualified)
                ),
            ));
        }
        let slot = self.entry_alloca(sctx.function, "ctortmp", class.ll.into())?;
        self.construct_in_place(class, slot, args, span)?;
        let loaded = self.builder.build_load(class.ll, slot, "ctorload")?;
        Ok(Value {
            llvm: Some(loaded),
            ty: Ty::UserDefined(class.qualified),
            is_mutable: true,
        })
    }

    /// Run a constructor over already-allocated storage.
    pub(crate) fn construct_in_place(
        &self,
        class: &Rc<ClassType<'ctx>>,
        this_ptr: inkwell::values::PointerValue<'ctx>,
        args: Vec<Value<'ctx>>,
        span: Span,
    ) -> Result<(), CodegenError> {
        let arg_count = args.len();
        let mut full_args = vec![Value {
            llvm: Some(this_ptr.into()),
            ty: Ty::pointer_to(Ty::UserDefined(class.qualified)),
            is_mutable: true,
        }];
        full_args.extend(args);

        let mut path = class.ns.clone();
        path.push(Namespace {
            name: class.name,
            kind: NamespaceKind::Class,
        });
        let qualified = path.qualify(self.interner, "new");

        match self.find_overload(&qualified, &mut full_args, span)? {
            Some((function, symbol, _)) => {
                self.emit_call(function, &symbol, &full_args, Ty::VOID, span)?;
                Ok(())
            }
            None if arg_count == 0 => Ok(()),
            None => Err(self.error(
                span,
                format!(
                    "class '{}' has no constructor matching these arguments",
                    self.interner.lookup(class.qualified)
                ),
            )),
        }
    }

    /// Invoke a class's destructor over a pointer to an instance.
    pub(crate) fn invoke_destructor_on(
        &self,
        class: &ClassType<'ctx>,
        this_ptr: inkwell::values::PointerValue<'ctx>,
    ) -> Result<(), CodegenError> {
        if let Some(symbol) = &class.dtor_symbol {
            if let Some(dtor) = self.llmod.get_function(symbol) {
                self.builder
                    .build_call(dtor, &[this_ptr.into()], "")?;
            }
        }
        Ok(())
    }

    /// Explicit template-argument call: a function-template
    /// instantiation, or a class-template constructor.
    pub(crate) fn lower_template_call(
        &self,
        callee: ExprId,
        template_args: &[ParsedType],
        args: &[ExprId],
        extra_first: Option<Value<'ctx>>,
        span: Span,
        scope: &SymbolTable<'ctx>,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<Value<'ctx>, CodegenError> {
        let unit = self.unit();
        let ExprKind::Ident(name) = unit.arena.expr(callee).kind else {
            return Err(self.error(span, "template call target must be a plain name"));
        };

        let arg_tys = template_args
            .iter()
            .map(|arg| self.create_ty(arg, span))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(template) = self.find_fn_template(name, arg_tys.len()) {
            let (function, symbol) = self.instantiate_fn_template(&template, &arg_tys, span)?;
            let mut arg_values = self.lower_args(args, extra_first, scope, sctx)?;

            let params = self
                .param_types
                .borrow()
                .get(&symbol)
                .cloned()
                .unwrap_or_default();
            if arg_values.len() != params.len() {
                return Err(self.error(span, "incorrect arguments passed"));
            }
            self.coerce_args(&mut arg_values, &params, span)?;
            let ret_ty = self
                .return_types
                .borrow()
                .get(&symbol)
                .cloned()
                .unwrap_or(Ty::VOID);
            return self.emit_call(function, &symbol, &arg_values, ret_ty, span);
        }

        // Not a function template: try a class template constructor.
        let ty = self.instantiate_class_template(name, arg_tys, span)?;
        let Ty::UserDefined(qualified) = &ty else {
            return Err(self.error(span, "template instantiation did not produce a class"));
        };
        let class = self
            .classes
            .borrow()
            .get(self.interner.lookup(*qualified))
            .cloned()
            .ok_or_else(|| self.error(span, "template instantiation did not produce a class"))?;
        let arg_values = self.lower_args(args, extra_first, scope, sctx)?;
        self.construct_class(&class, arg_values, span, sctx)
    }

    /// Find a function template by name and arity under the current
    /// hierarchy.
    pub(crate) fn find_fn_template(
        &self,
        name: Name,
        arity: usize,
    ) -> Option<Rc<crate::context::FnTemplate>> {
        let ns = self.ns.borrow().clone();
        for depth in (0..=ns.len()).rev() {
            let key = crate::context::TemplateKey {
                name,
                arity,
                ns: ns.prefix(depth),
            };
            if let Some(template) = self.fn_templates.borrow().get(&key).cloned() {
                return Some(template);
            }
        }
        None
    }
}
