//! Top-level lowering: function declarations and definitions, classes,
//! unions, typedefs, namespaces, and template registration and
//! instantiation.

use std::rc::Rc;

use inkwell::module::Linkage;
use inkwell::types::{BasicType, BasicTypeEnum};
use inkwell::values::FunctionValue;
use lumen_ir::ast::{
    Accessibility, AttrSet, ClassDef, ClassMember, FunctionDecl, FunctionDef, Item, ItemKind,
    StmtId, TranslationUnit, CLASS_DEFAULT_ACCESSIBILITY,
};
use lumen_ir::{Name, Span};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::context::{
    ClassField, ClassTemplate, ClassType, CodegenCx, FnTemplate, Namespace, NamespaceKind,
    StmtCtx, TemplateKey, UnionType,
};
use crate::error::CodegenError;
use crate::mangle;
use crate::scope::{SymbolTable, Variable};
use crate::types::Ty;

impl<'ctx> CodegenCx<'ctx> {
    /// Lower one translation unit's items in order.
    pub fn lower_unit(&self, unit: &TranslationUnit) -> Result<(), CodegenError> {
        for item in &unit.items {
            self.lower_item(item)?;
        }
        Ok(())
    }

    fn lower_item(&self, item: &Item) -> Result<(), CodegenError> {
        match &item.kind {
            ItemKind::FunctionDecl(decl) => {
                self.declare_function(decl, item.attrs, true, true, None, None)?;
                Ok(())
            }
            ItemKind::FunctionDef(def) => {
                if def.decl.is_template() {
                    self.register_fn_template(def, item.attrs);
                    return Ok(());
                }
                self.lower_function_def(def, item.attrs, None, None)?;
                Ok(())
            }
            ItemKind::ClassDecl(name) => self.declare_class(*name),
            ItemKind::ClassDef(def) => {
                if def.is_template() {
                    self.register_class_template(def);
                    return Ok(());
                }
                self.define_class(def, None)?;
                Ok(())
            }
            ItemKind::UnionDef(def) => self.define_union(def),
            ItemKind::Typedef { alias, ty } => {
                let resolved = self.create_ty(ty, item.span)?;
                let qualified = self
                    .ns
                    .borrow()
                    .qualify(self.interner, self.interner.lookup(*alias));
                let key = self.interner.lookup(self.interner.intern(&qualified));
                self.aliases.borrow_mut().insert(key, resolved);
                Ok(())
            }
            // Imported units were collected up front and lowered before
            // this unit; nothing remains to do here.
            ItemKind::Import { .. } => Ok(()),
            ItemKind::Namespace { name, items } => {
                self.ns.borrow_mut().push(Namespace {
                    name: *name,
                    kind: NamespaceKind::Namespace,
                });
                let result = items.iter().try_for_each(|item| self.lower_item(item));
                self.ns.borrow_mut().pop();
                result
            }
        }
    }

    fn register_fn_template(&self, def: &FunctionDef, attrs: AttrSet) {
        let ns = self.ns.borrow().clone();
        let key = TemplateKey {
            name: def.decl.name,
            arity: def.decl.template_params.len(),
            ns: ns.clone(),
        };
        debug!(name = self.interner.lookup(def.decl.name), "registering function template");
        self.fn_templates.borrow_mut().insert(
            key,
            Rc::new(FnTemplate {
                def: def.clone(),
                attrs,
                ns,
                unit: self.unit(),
            }),
        );
    }

    fn register_class_template(&self, def: &ClassDef) {
        let ns = self.ns.borrow().clone();
        let key = TemplateKey {
            name: def.name,
            arity: def.template_params.len(),
            ns: ns.clone(),
        };
        debug!(name = self.interner.lookup(def.name), "registering class template");
        self.class_templates.borrow_mut().insert(
            key,
            Rc::new(ClassTemplate {
                def: def.clone(),
                ns,
                unit: self.unit(),
            }),
        );
    }

    /// Declare (or reuse) the back-end function for a signature.
    ///
    /// `extern`, `nomangle`, and `main` keep their source names; every
    /// other function gets a mangled symbol from the namespace path,
    /// accessibility, and parameter types. Methods pass the receiver
    /// type in `this_ty`; template instantiation passes a `name_suffix`
    /// encoding the argument types.
    pub(crate) fn declare_function(
        &self,
        decl: &FunctionDecl,
        attrs: AttrSet,
        is_public: bool,
        is_extern: bool,
        this_ty: Option<&Ty>,
        name_suffix: Option<&str>,
    ) -> Result<(FunctionValue<'ctx>, String), CodegenError> {
        let span = decl.span;
        let name_text = self.interner.lookup(decl.name);

        let this_offset = usize::from(this_ty.is_some());
        let mut param_tys = Vec::with_capacity(decl.params.params.len() + this_offset);
        if let Some(this) = this_ty {
            param_tys.push(Ty::pointer_to(this.clone()));
        }
        for param in &decl.params.params {
            let ty = self.create_ty(&param.ty, param.span)?;
            if ty.is_void() {
                return Err(self.error(param.span, "parameter has incomplete type 'void'"));
            }
            param_tys.push(ty);
        }
        let ret_ty = self.create_ty(&decl.return_ty, span)?;

        let base_name = match name_suffix {
            Some(suffix) => format!("{name_text}{suffix}"),
            None => name_text.to_owned(),
        };

        let verbatim = is_extern || attrs.nomangle || name_text == "main";
        let symbol = if verbatim {
            name_text.to_owned()
        } else {
            mangle::mangle_function(
                self,
                &self.ns.borrow(),
                &base_name,
                decl.accessibility,
                &param_tys[this_offset..],
                decl.is_constructor,
                decl.is_destructor,
            )
        };

        if let Some(existing) = self.llmod.get_function(&symbol) {
            return Ok((existing, symbol));
        }

        let linkage = if is_extern {
            Linkage::External
        } else if !is_public || decl.accessibility == Accessibility::Private {
            Linkage::Internal
        } else {
            Linkage::External
        };

        let param_ll: Vec<inkwell::types::BasicMetadataTypeEnum<'ctx>> = param_tys
            .iter()
            .map(|ty| self.llvm_type(ty).map(Into::into))
            .collect::<Result<_, _>>()?;
        let fn_type = if ret_ty.is_void() {
            self.llcx.void_type().fn_type(&param_ll, decl.params.is_vararg)
        } else {
            self.llvm_type(&ret_ty)?.fn_type(&param_ll, decl.params.is_vararg)
        };
        let function = self.llmod.add_function(&symbol, fn_type, Some(linkage));

        for (i, param) in decl.params.params.iter().enumerate() {
            if let Some(arg) = function.get_nth_param((i + this_offset) as u32) {
                arg.set_name(self.interner.lookup(param.name));
            }
        }

        self.return_types
            .borrow_mut()
            .insert(symbol.clone(), ret_ty);
        self.param_types
            .borrow_mut()
            .insert(symbol.clone(), param_tys);
        self.fn_access
            .borrow_mut()
            .insert(symbol.clone(), decl.accessibility);
        if decl.params.is_vararg {
            self.variadic_fns.borrow_mut().insert(symbol.clone());
        }
        if attrs.nodiscard {
            self.nodiscard_fns.borrow_mut().insert(symbol.clone());
        }
        if !verbatim {
            let qualified = self.ns.borrow().qualify(self.interner, &base_name);
            self.overloads
                .borrow_mut()
                .entry(qualified)
                .or_default()
                .push(symbol.clone());
        }

        Ok((function, symbol))
    }

    pub(crate) fn lower_function_def(
        &self,
        def: &FunctionDef,
        attrs: AttrSet,
        this_ty: Option<&Ty>,
        name_suffix: Option<&str>,
    ) -> Result<FunctionValue<'ctx>, CodegenError> {
        let (function, symbol) =
            self.declare_function(&def.decl, attrs, def.is_public, false, this_ty, name_suffix)?;

        if function.count_basic_blocks() > 0 {
            return Err(self.error(
                def.decl.span,
                format!(
                    "redefinition of '{}'",
                    self.interner.lookup(def.decl.name)
                ),
            ));
        }

        self.build_function_body(function, &symbol, &def.decl, def.body, this_ty)?;
        Ok(function)
    }

    /// Build a function's body: entry block, parameter slots, return
    /// slot, the lowered statement tree, the function-wide exit block,
    /// then verification.
    ///
    /// Builder position and the scope stack are saved and restored so
    /// template instantiation can nest inside another function's
    /// lowering.
    fn build_function_body(
        &self,
        function: FunctionValue<'ctx>,
        symbol: &str,
        decl: &FunctionDecl,
        body: StmtId,
        this_ty: Option<&Ty>,
    ) -> Result<(), CodegenError> {
        let saved_block = self.builder.get_insert_block();
        let saved_scopes = self.scopes.replace(Vec::new());

        let result = self.build_function_body_inner(function, symbol, decl, body, this_ty);

        self.scopes.replace(saved_scopes);
        if let Some(block) = saved_block {
            self.builder.position_at_end(block);
        }
        result
    }

    fn build_function_body_inner(
        &self,
        function: FunctionValue<'ctx>,
        symbol: &str,
        decl: &FunctionDecl,
        body: StmtId,
        this_ty: Option<&Ty>,
    ) -> Result<(), CodegenError> {
        let entry = self.append_block(function, "entry");
        self.builder.position_at_end(entry);

        let param_tys = self
            .param_types
            .borrow()
            .get(symbol)
            .cloned()
            .unwrap_or_default();
        let ret_ty = self
            .return_types
            .borrow()
            .get(symbol)
            .cloned()
            .unwrap_or(Ty::VOID);

        let mut params = SymbolTable::new();
        let this_offset = usize::from(this_ty.is_some());

        if this_ty.is_some() {
            let this_name = self.interner.intern("this");
            let arg = function
                .get_nth_param(0)
                .ok_or_else(|| CodegenError::new("method is missing its receiver"))?;
            arg.set_name("this");
            let ty = param_tys[0].clone();
            let slot = self.entry_alloca(function, "this", self.llvm_type(&ty)?)?;
            self.builder.build_store(slot, arg)?;
            params.insert(this_name, Rc::new(Variable::new(slot, ty, true)));
        }

        for (i, param) in decl.params.params.iter().enumerate() {
            let arg = function
                .get_nth_param((i + this_offset) as u32)
                .ok_or_else(|| CodegenError::new("parameter count mismatch"))?;
            let ty = param_tys[i + this_offset].clone();
            let slot = self.entry_alloca(
                function,
                self.interner.lookup(param.name),
                self.llvm_type(&ty)?,
            )?;
            self.builder.build_store(slot, arg)?;
            params.insert(
                param.name,
                Rc::new(Variable::new(slot, ty, param.is_mutable)),
            );
        }

        let exit_bb = self.append_block(function, "exit");
        let return_slot = if ret_ty.is_void() {
            None
        } else {
            Some(self.entry_alloca(function, "retval", self.llvm_type(&ret_ty)?)?)
        };

        let sctx = StmtCtx {
            function,
            return_slot,
            return_ty: ret_ty.clone(),
            exit_bb,
            break_bb: None,
            continue_bb: None,
            loop_scope_depth: 0,
        };

        if decl.is_constructor {
            if let Some(this) = this_ty {
                self.emit_member_inits(this, &params, decl.span, &sctx)?;
            }
        }

        self.lower_scoped_stmt(body, &params, &sctx)?;

        if !self.block_terminated() {
            if let Some(slot) = return_slot {
                let ll_ret = self.llvm_type(&ret_ty)?;
                if symbol == "main" && ll_ret.is_int_type() {
                    // main implicitly returns 0.
                    self.builder
                        .build_store(slot, ll_ret.into_int_type().const_zero())?;
                } else {
                    self.builder.build_store(slot, undef_value(ll_ret))?;
                }
            }
            self.builder.build_unconditional_branch(exit_bb)?;
        }

        self.builder.position_at_end(exit_bb);
        match return_slot {
            Some(slot) => {
                let loaded = self
                    .builder
                    .build_load(self.llvm_type(&ret_ty)?, slot, "retval")?;
                self.builder.build_return(Some(&loaded))?;
            }
            None => {
                self.builder.build_return(None)?;
            }
        }

        if !function.verify(true) {
            return Err(CodegenError::new(format!(
                "function verification failed for '{symbol}'"
            )));
        }
        Ok(())
    }

    /// Default member initializers, stored through `this` at the top of
    /// every constructor.
    fn emit_member_inits(
        &self,
        this_ty: &Ty,
        scope: &SymbolTable<'ctx>,
        span: Span,
        sctx: &StmtCtx<'ctx>,
    ) -> Result<(), CodegenError> {
        let Ty::UserDefined(qualified) = this_ty else {
            return Ok(());
        };
        let class = self
            .classes
            .borrow()
            .get(self.interner.lookup(*qualified))
            .cloned();
        let Some(class) = class else {
            return Ok(());
        };

        let this_name = self.interner.intern("this");
        let this_var = scope
            .get(this_name)
            .ok_or_else(|| CodegenError::new("constructor is missing 'this'"))?;
        let this_ptr = self
            .builder
            .build_load(self.ptr_type, this_var.ptr, "this")?
            .into_pointer_value();

        for (idx, field) in class.fields.iter().enumerate() {
            let Some(init) = field.init else {
                continue;
            };
            let value = self.lower_expr(init, scope, sctx)?;
            let value = self.coerce(value, &field.ty, span)?;
            let field_ptr = self.builder.build_struct_gep(
                class.ll,
                this_ptr,
                idx as u32,
                self.interner.lookup(field.name),
            )?;
            self.builder
                .build_store(field_ptr, self.basic(&value, span)?)?;
        }
        Ok(())
    }

    /// `class Name;` — an opaque handle usable behind pointers.
    fn declare_class(&self, name: Name) -> Result<(), CodegenError> {
        let qualified_str = self
            .ns
            .borrow()
            .qualify(self.interner, self.interner.lookup(name));
        let qualified = self.interner.intern(&qualified_str);
        let key = self.interner.lookup(qualified);

        if self.classes.borrow().contains_key(key) {
            return Ok(());
        }
        let ll = self.llcx.opaque_struct_type(&qualified_str);
        self.classes.borrow_mut().insert(
            key,
            Rc::new(ClassType {
                name,
                qualified,
                ns: self.ns.borrow().clone(),
                fields: Vec::new(),
                has_user_dtor: false,
                is_opaque: true,
                ll,
                dtor_symbol: None,
                unit: self.unit(),
            }),
        );
        Ok(())
    }

    /// Define a class: register it, resolve members, lower methods with
    /// the class pushed onto the hierarchy, and synthesize the default
    /// constructor/destructor where needed.
    pub(crate) fn define_class(
        &self,
        def: &ClassDef,
        instantiated_name: Option<&str>,
    ) -> Result<Ty, CodegenError> {
        let base_text = self.interner.lookup(def.name);
        let display_name = instantiated_name.unwrap_or(base_text);
        let reg_name = self.interner.intern(display_name);
        let qualified_str = self.ns.borrow().qualify(self.interner, display_name);
        let qualified = self.interner.intern(&qualified_str);
        let key = self.interner.lookup(qualified);

        debug!(class = key, "defining class");

        // Reuse a forward declaration's struct; a second definition is
        // an error.
        let ll = {
            let classes = self.classes.borrow();
            match classes.get(key) {
                Some(existing) if existing.is_opaque => existing.ll,
                Some(_) => {
                    return Err(self.error(
                        def.span,
                        format!("redefinition of class '{display_name}'"),
                    ))
                }
                None => self.llcx.opaque_struct_type(&qualified_str),
            }
        };

        // Register an opaque placeholder first so members may contain
        // pointers to the class being defined.
        self.classes.borrow_mut().insert(
            key,
            Rc::new(ClassType {
                name: reg_name,
                qualified,
                ns: self.ns.borrow().clone(),
                fields: Vec::new(),
                has_user_dtor: false,
                is_opaque: true,
                ll,
                dtor_symbol: None,
                unit: self.unit(),
            }),
        );

        enum MethodKind {
            Plain,
            Ctor,
            Dtor,
        }

        let mut access = CLASS_DEFAULT_ACCESSIBILITY;
        let mut fields = Vec::new();
        let mut methods: Vec<(Accessibility, &FunctionDef, MethodKind)> = Vec::new();
        let mut has_user_dtor = false;
        let mut dtor_access = Accessibility::Public;
        let mut has_user_ctor = false;

        for member in &def.members {
            match member {
                ClassMember::Access(a) => access = *a,
                ClassMember::Field(field) => {
                    let ty = self.create_ty(&field.ty, field.span)?;
                    if ty.is_void() {
                        return Err(self.error(field.span, "member has incomplete type 'void'"));
                    }
                    fields.push(ClassField {
                        name: field.name,
                        ty,
                        access,
                        init: field.init,
                    });
                }
                ClassMember::Method(method) => {
                    methods.push((access, method, MethodKind::Plain));
                }
                ClassMember::Constructor(ctor) => {
                    has_user_ctor = true;
                    methods.push((access, ctor, MethodKind::Ctor));
                }
                ClassMember::Destructor(dtor) => {
                    has_user_dtor = true;
                    dtor_access = access;
                    methods.push((access, dtor, MethodKind::Dtor));
                }
            }
        }

        let field_lls: Vec<BasicTypeEnum<'ctx>> = fields
            .iter()
            .map(|field| self.llvm_type(&field.ty))
            .collect::<Result<_, _>>()?;
        ll.set_body(&field_lls, false);

        // The destructor symbol is fixed here so scope exits can call
        // it without a lookup.
        let mut class_path = self.ns.borrow().clone();
        class_path.push(Namespace {
            name: reg_name,
            kind: NamespaceKind::Class,
        });
        let dtor_symbol =
            mangle::mangle_function(self, &class_path, "delete", dtor_access, &[], false, true);

        let class = Rc::new(ClassType {
            name: reg_name,
            qualified,
            ns: self.ns.borrow().clone(),
            fields,
            has_user_dtor,
            is_opaque: false,
            ll,
            dtor_symbol: Some(dtor_symbol.clone()),
            unit: self.unit(),
        });
        self.classes.borrow_mut().insert(key, Rc::clone(&class));

        // Methods lower with the class as a hierarchy entry of class
        // kind.
        self.ns.borrow_mut().push(Namespace {
            name: reg_name,
            kind: NamespaceKind::Class,
        });
        let this_ty = Ty::UserDefined(qualified);
        let result = (|| -> Result<(), CodegenError> {
            for (member_access, method, kind) in methods {
                let mut def = method.clone();
                def.decl.accessibility = member_access;
                match kind {
                    MethodKind::Ctor => {
                        def.decl.is_constructor = true;
                    }
                    MethodKind::Dtor => {
                        def.decl.is_destructor = true;
                    }
                    MethodKind::Plain => {}
                }
                self.lower_function_def(&def, AttrSet::default(), Some(&this_ty), None)?;
            }

            if !has_user_ctor && class.fields.iter().any(|f| f.init.is_some()) {
                self.synthesize_default_ctor(&class)?;
            }
            if !has_user_dtor {
                self.synthesize_default_dtor(&class, &dtor_symbol)?;
            }
            Ok(())
        })();
        self.ns.borrow_mut().pop();
        result?;

        Ok(Ty::UserDefined(qualified))
    }

    /// A no-argument constructor that applies field default
    /// initializers, for classes that declare defaults but no
    /// constructor of their own.
    fn synthesize_default_ctor(
        &self,
        class: &Rc<ClassType<'ctx>>,
    ) -> Result<(), CodegenError> {
        let decl = FunctionDecl {
            name: self.interner.intern("new"),
            template_params: Vec::new(),
            params: Default::default(),
            return_ty: lumen_ir::ast::ParsedType::Builtin(lumen_ir::ast::BuiltinKind::Void),
            accessibility: Accessibility::Public,
            is_constructor: true,
            is_destructor: false,
            span: Span::DUMMY,
        };
        let this_ty = Ty::UserDefined(class.qualified);
        let (function, symbol) =
            self.declare_function(&decl, AttrSet::default(), true, false, Some(&this_ty), None)?;
        self.synthesize_method_body(function, &symbol, class, true)
    }

    /// The default destructor: destroys class-typed fields in reverse
    /// declaration order, otherwise a no-op.
    fn synthesize_default_dtor(
        &self,
        class: &Rc<ClassType<'ctx>>,
        symbol: &str,
    ) -> Result<(), CodegenError> {
        let param_tys = vec![Ty::pointer_to(Ty::UserDefined(class.qualified))];
        let param_ll: Vec<inkwell::types::BasicMetadataTypeEnum<'ctx>> = param_tys
            .iter()
            .map(|ty| self.llvm_type(ty).map(Into::into))
            .collect::<Result<_, _>>()?;
        let fn_type = self.llcx.void_type().fn_type(&param_ll, false);
        let function = self
            .llmod
            .add_function(symbol, fn_type, Some(Linkage::External));

        self.return_types
            .borrow_mut()
            .insert(symbol.to_owned(), Ty::VOID);
        self.param_types
            .borrow_mut()
            .insert(symbol.to_owned(), param_tys);
        self.fn_access
            .borrow_mut()
            .insert(symbol.to_owned(), Accessibility::Public);

        self.synthesize_method_body(function, symbol, class, false)
    }

    /// Shared body builder for synthesized members: either the member
    /// initializers (default constructor) or reverse-order field
    /// destruction (default destructor).
    fn synthesize_method_body(
        &self,
        function: FunctionValue<'ctx>,
        symbol: &str,
        class: &Rc<ClassType<'ctx>>,
        is_ctor: bool,
    ) -> Result<(), CodegenError> {
        let saved_block = self.builder.get_insert_block();
        let saved_scopes = self.scopes.replace(Vec::new());

        let result = (|| -> Result<(), CodegenError> {
            let entry = self.append_block(function, "entry");
            self.builder.position_at_end(entry);

            let this_arg = function
                .get_nth_param(0)
                .ok_or_else(|| CodegenError::new("synthesized member is missing 'this'"))?;
            this_arg.set_name("this");
            let this_ptr = this_arg.into_pointer_value();

            if is_ctor {
                let exit_bb = self.append_block(function, "exit");
                let this_name = self.interner.intern("this");
                let slot = self.entry_alloca(function, "this", self.ptr_type.into())?;
                self.builder.build_store(slot, this_ptr)?;
                let mut scope = SymbolTable::new();
                scope.insert(
                    this_name,
                    Rc::new(Variable::new(
                        slot,
                        Ty::pointer_to(Ty::UserDefined(class.qualified)),
                        true,
                    )),
                );
                let sctx = StmtCtx {
                    function,
                    return_slot: None,
                    return_ty: Ty::VOID,
                    exit_bb,
                    break_bb: None,
                    continue_bb: None,
                    loop_scope_depth: 0,
                };
                self.emit_member_inits(
                    &Ty::UserDefined(class.qualified),
                    &scope,
                    Span::DUMMY,
                    &sctx,
                )?;
                self.builder.build_unconditional_branch(exit_bb)?;
                self.builder.position_at_end(exit_bb);
            } else {
                for (idx, field) in class.fields.iter().enumerate().rev() {
                    let Ty::UserDefined(field_class_name) = &field.ty else {
                        continue;
                    };
                    let field_class = self
                        .classes
                        .borrow()
                        .get(self.interner.lookup(*field_class_name))
                        .cloned();
                    let Some(field_class) = field_class else {
                        continue;
                    };
                    let field_ptr = self.builder.build_struct_gep(
                        class.ll,
                        this_ptr,
                        idx as u32,
                        self.interner.lookup(field.name),
                    )?;
                    self.invoke_destructor_on(&field_class, field_ptr)?;
                }
            }

            self.builder.build_return(None)?;
            if !function.verify(true) {
                return Err(CodegenError::new(format!(
                    "function verification failed for '{symbol}'"
                )));
            }
            Ok(())
        })();

        self.scopes.replace(saved_scopes);
        if let Some(block) = saved_block {
            self.builder.position_at_end(block);
        }
        result
    }

    /// Define a tagged union: `{ i32 tag, [max-size x i8] payload }`.
    fn define_union(&self, def: &lumen_ir::ast::UnionDef) -> Result<(), CodegenError> {
        if !def.template_params.is_empty() {
            return Err(self.error(def.span, "union templates are not supported"));
        }

        let qualified_str = self
            .ns
            .borrow()
            .qualify(self.interner, self.interner.lookup(def.name));
        let qualified = self.interner.intern(&qualified_str);
        let key = self.interner.lookup(qualified);

        if self.unions.borrow().contains_key(key) {
            return Err(self.error(
                def.span,
                format!("redefinition of union '{qualified_str}'"),
            ));
        }

        let mut tags = Vec::with_capacity(def.tags.len());
        let mut payload_size = 0u64;
        for tag in &def.tags {
            let ty = self.create_ty(&tag.ty, tag.span)?;
            if ty.is_void() {
                return Err(self.error(tag.span, "union tag has incomplete type 'void'"));
            }
            payload_size = payload_size.max(self.abi_size(&ty)?);
            tags.push((tag.name, ty));
        }

        let ll = self.llcx.opaque_struct_type(&qualified_str);
        let payload = self
            .llcx
            .i8_type()
            .array_type(u32::try_from(payload_size).unwrap_or(u32::MAX));
        ll.set_body(&[self.llcx.i32_type().into(), payload.into()], false);

        self.unions.borrow_mut().insert(
            key,
            Rc::new(UnionType {
                name: def.name,
                qualified,
                ns: self.ns.borrow().clone(),
                tags,
                ll,
            }),
        );
        Ok(())
    }

    /// Instantiate a class template (memoized on name, arguments, and
    /// the namespace the template was registered under).
    pub(crate) fn instantiate_class_template(
        &self,
        name: Name,
        args: Vec<Ty>,
        span: Span,
    ) -> Result<Ty, CodegenError> {
        let ns = self.ns.borrow().clone();
        let mut found = None;
        for depth in (0..=ns.len()).rev() {
            let key = TemplateKey {
                name,
                arity: args.len(),
                ns: ns.prefix(depth),
            };
            if let Some(template) = self.class_templates.borrow().get(&key).cloned() {
                found = Some(template);
                break;
            }
        }
        let template = found.ok_or_else(|| {
            self.error(
                span,
                format!("unknown type name '{}'", self.interner.lookup(name)),
            )
        })?;

        let memo_key = (name, args.clone(), template.ns.clone());
        if let Some(ty) = self.created_class_templates.borrow().get(&memo_key).cloned() {
            return Ok(ty);
        }

        let arg_names: Vec<String> = args.iter().map(|ty| ty.display(self)).collect();
        let inst_name = format!("{}<{}>", self.interner.lookup(name), arg_names.join(", "));
        debug!(instance = inst_name, "instantiating class template");

        let mut bindings = FxHashMap::default();
        for (param, arg) in template.def.template_params.iter().zip(&args) {
            bindings.insert(*param, arg.clone());
        }
        self.template_args.borrow_mut().push(bindings);
        let saved_ns = self.ns.replace(template.ns.clone());
        let saved_unit = self.swap_unit(Rc::clone(&template.unit));

        let result = self.define_class(&template.def, Some(&inst_name));

        self.swap_unit(saved_unit);
        self.ns.replace(saved_ns);
        self.template_args.borrow_mut().pop();

        let ty = result?;
        self.created_class_templates
            .borrow_mut()
            .insert(memo_key, ty.clone());
        Ok(ty)
    }

    /// Instantiate a function template for concrete argument types.
    /// The instantiated symbol encodes the argument signature, so a
    /// repeated instantiation finds the first one in the module.
    pub(crate) fn instantiate_fn_template(
        &self,
        template: &FnTemplate,
        args: &[Ty],
        span: Span,
    ) -> Result<(FunctionValue<'ctx>, String), CodegenError> {
        if args.len() != template.def.decl.template_params.len() {
            return Err(self.error(span, "wrong number of template arguments"));
        }

        let sigs: String = args.iter().map(|ty| mangle::type_sig(self, ty)).collect();
        let suffix = format!("I{sigs}E");

        let mut bindings = FxHashMap::default();
        for (param, arg) in template.def.decl.template_params.iter().zip(args) {
            bindings.insert(*param, arg.clone());
        }
        self.template_args.borrow_mut().push(bindings);
        let saved_ns = self.ns.replace(template.ns.clone());
        let saved_unit = self.swap_unit(Rc::clone(&template.unit));

        let result = (|| -> Result<(FunctionValue<'ctx>, String), CodegenError> {
            let (function, symbol) = self.declare_function(
                &template.def.decl,
                template.attrs,
                template.def.is_public,
                false,
                None,
                Some(&suffix),
            )?;
            if function.count_basic_blocks() == 0 {
                debug!(symbol, "instantiating function template");
                self.build_function_body(
                    function,
                    &symbol,
                    &template.def.decl,
                    template.def.body,
                    None,
                )?;
            }
            Ok((function, symbol))
        })();

        self.swap_unit(saved_unit);
        self.ns.replace(saved_ns);
        self.template_args.borrow_mut().pop();
        result
    }
}

/// An undef constant of any basic type, for the implicit result of a
/// non-void function that falls off the end.
fn undef_value(ty: BasicTypeEnum<'_>) -> inkwell::values::BasicValueEnum<'_> {
    match ty {
        BasicTypeEnum::IntType(t) => t.get_undef().into(),
        BasicTypeEnum::FloatType(t) => t.get_undef().into(),
        BasicTypeEnum::PointerType(t) => t.get_undef().into(),
        BasicTypeEnum::StructType(t) => t.get_undef().into(),
        BasicTypeEnum::ArrayType(t) => t.get_undef().into(),
        BasicTypeEnum::VectorType(t) => t.get_undef().into(),
        BasicTypeEnum::ScalableVectorType(t) => t.get_undef().into(),
    }
}
