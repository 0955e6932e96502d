//! Per-translation-unit codegen context.
//!
//! [`CodegenCx`] owns the LLVM module and builder plus every registry
//! the lowering consults: classes, unions, aliases, templates,
//! instantiation memos, function signatures, the namespace hierarchy,
//! and the live scope stack used for destructor scheduling. State that
//! must be updated from `&self` during the recursive tree walk lives
//! behind `RefCell`s.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::targets::TargetData;
use inkwell::types::{PointerType, StructType};
use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};
use inkwell::AddressSpace;
use lumen_ir::ast::{
    Accessibility, AttrSet, ClassDef, ExprArena, ExprId, FunctionDef,
};
use lumen_ir::{Name, SourceMap, Span, StringInterner};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::CodegenError;
use crate::scope::Variable;
use crate::types::Ty;

/// One parsed source file: AST arena, position cache, path. Shared by
/// the context and the template registries, because instantiation can
/// happen long after the unit's own items were lowered.
pub struct UnitInfo {
    pub arena: ExprArena,
    pub source_map: SourceMap,
    pub file: PathBuf,
}

/// Whether a hierarchy entry came from `namespace` or from a class.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    Namespace,
    Class,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub name: Name,
    pub kind: NamespaceKind,
}

/// The namespace hierarchy at the current lowering point. Used both
/// for name resolution (innermost prefix first) and for mangling.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NamespaceStack {
    entries: Vec<Namespace>,
}

impl NamespaceStack {
    pub fn new() -> Self {
        NamespaceStack::default()
    }

    pub fn push(&mut self, ns: Namespace) {
        self.entries.push(ns);
    }

    pub fn pop(&mut self) -> Option<Namespace> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Namespace> {
        self.entries.iter()
    }

    pub fn contains(&self, name: Name) -> bool {
        self.entries.iter().any(|ns| ns.name == name)
    }

    /// The prefix holding the first `len` entries.
    pub fn prefix(&self, len: usize) -> NamespaceStack {
        NamespaceStack {
            entries: self.entries[..len].to_vec(),
        }
    }

    /// Qualified name under this hierarchy, `a::b::name`.
    pub fn qualify(&self, interner: &StringInterner, name: &str) -> String {
        let mut out = String::new();
        for ns in &self.entries {
            out.push_str(interner.lookup(ns.name));
            out.push_str("::");
        }
        out.push_str(name);
        out
    }
}

/// A class field with its resolved type and accessibility.
pub struct ClassField {
    pub name: Name,
    pub ty: Ty,
    pub access: Accessibility,
    /// Default initializer expression, lowered at the top of every
    /// constructor.
    pub init: Option<ExprId>,
}

/// A registered class.
pub struct ClassType<'ctx> {
    pub name: Name,
    /// Interned qualified name; the registry key and the `Ty` handle.
    pub qualified: Name,
    /// Hierarchy where the class was defined (not including the class
    /// itself); methods resolve under this path plus a class entry.
    pub ns: NamespaceStack,
    pub fields: Vec<ClassField>,
    pub has_user_dtor: bool,
    pub is_opaque: bool,
    pub ll: StructType<'ctx>,
    /// Mangled destructor symbol; every defined class has one (a
    /// default no-op is synthesized when the user wrote none).
    pub dtor_symbol: Option<String>,
    /// Unit owning the field initializer expressions.
    pub unit: Rc<UnitInfo>,
}

impl ClassType<'_> {
    pub fn field_index(&self, name: Name) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A registered tagged union.
pub struct UnionType<'ctx> {
    pub name: Name,
    pub qualified: Name,
    pub ns: NamespaceStack,
    /// `(tag name, payload type)` in declaration order; the tag
    /// discriminant is the index.
    pub tags: Vec<(Name, Ty)>,
    pub ll: StructType<'ctx>,
}

impl UnionType<'_> {
    pub fn tag_index(&self, name: Name) -> Option<usize> {
        self.tags.iter().position(|(tag, _)| *tag == name)
    }
}

/// Registry key for templates: base name, parameter count, and the
/// hierarchy the template was defined under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    pub name: Name,
    pub arity: usize,
    pub ns: NamespaceStack,
}

/// A function template held by value for later instantiation.
pub struct FnTemplate {
    pub def: FunctionDef,
    pub attrs: AttrSet,
    pub ns: NamespaceStack,
    pub unit: Rc<UnitInfo>,
}

/// A class template held by value for later instantiation.
pub struct ClassTemplate {
    pub def: ClassDef,
    pub ns: NamespaceStack,
    pub unit: Rc<UnitInfo>,
}

/// Memoization key for created class-template instantiations.
pub type CreatedTemplateKey = (Name, Vec<Ty>, NamespaceStack);

/// Locals owned by one live lexical scope, in declaration order.
/// Destructor drains walk this, never the hash table, so reverse
/// declaration order is exact.
#[derive(Default)]
pub struct ScopeFrame<'ctx> {
    pub class_locals: Vec<Rc<Variable<'ctx>>>,
}

/// A lowered expression: back-end value, language type, mutability.
/// `llvm` is `None` only for calls to `void` functions.
#[derive(Clone, Debug)]
pub struct Value<'ctx> {
    pub llvm: Option<BasicValueEnum<'ctx>>,
    pub ty: Ty,
    pub is_mutable: bool,
}

impl<'ctx> Value<'ctx> {
    pub fn new(llvm: BasicValueEnum<'ctx>, ty: Ty) -> Self {
        Value {
            llvm: Some(llvm),
            ty,
            is_mutable: false,
        }
    }

    pub fn mutable(llvm: BasicValueEnum<'ctx>, ty: Ty) -> Self {
        Value {
            llvm: Some(llvm),
            ty,
            is_mutable: true,
        }
    }

    pub fn unit() -> Self {
        Value {
            llvm: None,
            ty: Ty::VOID,
            is_mutable: false,
        }
    }
}

/// Statement-level lowering context threaded through the tree walk.
#[derive(Clone)]
pub struct StmtCtx<'ctx> {
    pub function: FunctionValue<'ctx>,
    /// Slot every `ret` stores into; `None` for `void` functions.
    pub return_slot: Option<PointerValue<'ctx>>,
    pub return_ty: Ty,
    /// The function-wide exit block that loads the slot and returns.
    pub exit_bb: BasicBlock<'ctx>,
    pub break_bb: Option<BasicBlock<'ctx>>,
    pub continue_bb: Option<BasicBlock<'ctx>>,
    /// Scope-stack depth at entry to the innermost loop body; `break`
    /// and `continue` drain destructors of every scope deeper than
    /// this.
    pub loop_scope_depth: usize,
}

/// Everything one translation unit's lowering needs.
pub struct CodegenCx<'ctx> {
    pub llcx: &'ctx Context,
    pub llmod: Module<'ctx>,
    pub builder: Builder<'ctx>,
    pub interner: &'ctx StringInterner,
    pub ptr_type: PointerType<'ctx>,
    pub target_data: TargetData,

    /// The unit currently being lowered; swapped during template
    /// instantiation so spans resolve against the right file.
    pub current_unit: RefCell<Rc<UnitInfo>>,

    // Registries, keyed by interned qualified names.
    pub classes: RefCell<FxHashMap<&'static str, Rc<ClassType<'ctx>>>>,
    pub unions: RefCell<FxHashMap<&'static str, Rc<UnionType<'ctx>>>>,
    pub aliases: RefCell<FxHashMap<&'static str, Ty>>,
    pub fn_templates: RefCell<FxHashMap<TemplateKey, Rc<FnTemplate>>>,
    pub class_templates: RefCell<FxHashMap<TemplateKey, Rc<ClassTemplate>>>,
    pub created_class_templates: RefCell<FxHashMap<CreatedTemplateKey, Ty>>,
    /// Stack of template-argument scopes; innermost binding wins.
    pub template_args: RefCell<Vec<FxHashMap<Name, Ty>>>,

    // Function signature registries, keyed by mangled symbol.
    pub return_types: RefCell<FxHashMap<String, Ty>>,
    pub param_types: RefCell<FxHashMap<String, Vec<Ty>>>,
    pub fn_access: RefCell<FxHashMap<String, Accessibility>>,
    pub variadic_fns: RefCell<FxHashSet<String>>,
    pub nodiscard_fns: RefCell<FxHashSet<String>>,
    /// Qualified unmangled name → mangled overload candidates.
    pub overloads: RefCell<FxHashMap<String, Vec<String>>>,

    pub ns: RefCell<NamespaceStack>,
    pub scopes: RefCell<Vec<ScopeFrame<'ctx>>>,
    pub type_cache: RefCell<FxHashMap<Ty, inkwell::types::BasicTypeEnum<'ctx>>>,
    /// Mangled name of the most recently emitted call, consulted by
    /// expression statements for `nodiscard` enforcement.
    pub last_call: RefCell<Option<String>>,
}

impl<'ctx> CodegenCx<'ctx> {
    pub fn new(
        llcx: &'ctx Context,
        interner: &'ctx StringInterner,
        module_name: &str,
        target_data: TargetData,
        root_unit: Rc<UnitInfo>,
    ) -> Self {
        let llmod = llcx.create_module(module_name);
        let builder = llcx.create_builder();
        let ptr_type = llcx.ptr_type(AddressSpace::default());

        CodegenCx {
            llcx,
            llmod,
            builder,
            interner,
            ptr_type,
            target_data,
            current_unit: RefCell::new(root_unit),
            classes: RefCell::new(FxHashMap::default()),
            unions: RefCell::new(FxHashMap::default()),
            aliases: RefCell::new(FxHashMap::default()),
            fn_templates: RefCell::new(FxHashMap::default()),
            class_templates: RefCell::new(FxHashMap::default()),
            created_class_templates: RefCell::new(FxHashMap::default()),
            template_args: RefCell::new(Vec::new()),
            return_types: RefCell::new(FxHashMap::default()),
            param_types: RefCell::new(FxHashMap::default()),
            fn_access: RefCell::new(FxHashMap::default()),
            variadic_fns: RefCell::new(FxHashSet::default()),
            nodiscard_fns: RefCell::new(FxHashSet::default()),
            overloads: RefCell::new(FxHashMap::default()),
            ns: RefCell::new(NamespaceStack::new()),
            scopes: RefCell::new(Vec::new()),
            type_cache: RefCell::new(FxHashMap::default()),
            last_call: RefCell::new(None),
        }
    }

    /// The unit currently being lowered.
    pub fn unit(&self) -> Rc<UnitInfo> {
        Rc::clone(&self.current_unit.borrow())
    }

    /// Swap the current unit, returning the previous one.
    pub fn swap_unit(&self, unit: Rc<UnitInfo>) -> Rc<UnitInfo> {
        self.current_unit.replace(unit)
    }

    /// Format a codegen error at a span: `file:line:col: message`, the
    /// source line, and a caret under the offending column.
    pub fn error(&self, span: Span, message: impl AsRef<str>) -> CodegenError {
        let unit = self.unit();
        let pos = unit.source_map.lookup(span);
        let line = unit.source_map.line_text(pos.line);
        let caret_pad = " ".repeat(pos.column.saturating_sub(1) as usize);
        CodegenError::new(format!(
            "{}:{}:{}: {}\n{}\n{}^",
            unit.file.display(),
            pos.line,
            pos.column,
            message.as_ref(),
            line,
            caret_pad,
        ))
    }

    /// Intern the qualified form of `name` under the current hierarchy.
    pub fn qualified_name(&self, name: Name) -> Name {
        let qualified = self
            .ns
            .borrow()
            .qualify(self.interner, self.interner.lookup(name));
        self.interner.intern(&qualified)
    }

    /// Resolve a name against the template-argument stack, innermost
    /// scope first.
    pub fn template_arg(&self, name: Name) -> Option<Ty> {
        self.template_args
            .borrow()
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).cloned())
    }

    /// The basic block instructions are currently inserted into.
    pub fn current_block(&self) -> Option<BasicBlock<'ctx>> {
        self.builder.get_insert_block()
    }

    /// True if the current block already ends in a terminator.
    pub fn block_terminated(&self) -> bool {
        self.current_block()
            .is_some_and(|bb| bb.get_terminator().is_some())
    }

    /// Append a named basic block to a function.
    pub fn append_block(
        &self,
        function: FunctionValue<'ctx>,
        name: &str,
    ) -> BasicBlock<'ctx> {
        self.llcx.append_basic_block(function, name)
    }

    /// Create an alloca in the function's entry block, hoisted so the
    /// back end can promote it to a register.
    pub fn entry_alloca(
        &self,
        function: FunctionValue<'ctx>,
        name: &str,
        ty: inkwell::types::BasicTypeEnum<'ctx>,
    ) -> Result<PointerValue<'ctx>, CodegenError> {
        let entry = function
            .get_first_basic_block()
            .ok_or_else(|| CodegenError::new("function has no entry block"))?;
        let tmp = self.llcx.create_builder();
        match entry.get_first_instruction() {
            Some(first) => tmp.position_before(&first),
            None => tmp.position_at_end(entry),
        }
        Ok(tmp.build_alloca(ty, name)?)
    }
}
