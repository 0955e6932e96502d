//! Lexically scoped symbol tables.

use std::rc::Rc;

use inkwell::values::PointerValue;
use lumen_ir::Name;
use rustc_hash::FxHashMap;

use crate::types::Ty;

/// A named binding: the stack slot backing it, its language-level type,
/// and whether stores through it are permitted.
#[derive(Debug)]
pub struct Variable<'ctx> {
    pub ptr: PointerValue<'ctx>,
    pub ty: Ty,
    pub is_mutable: bool,
}

impl<'ctx> Variable<'ctx> {
    pub fn new(ptr: PointerValue<'ctx>, ty: Ty, is_mutable: bool) -> Self {
        Variable {
            ptr,
            ty,
            is_mutable,
        }
    }
}

/// Identifier → variable mapping for one scope.
///
/// Nested scopes compose with [`SymbolTable::merged`]; the child wins
/// on collision, which is what makes shadowing work.
#[derive(Default)]
pub struct SymbolTable<'ctx> {
    entries: FxHashMap<Name, Rc<Variable<'ctx>>>,
}

impl<'ctx> SymbolTable<'ctx> {
    pub fn new() -> Self {
        SymbolTable {
            entries: FxHashMap::default(),
        }
    }

    /// Insert a fresh binding; the name must not already be bound in
    /// this table.
    pub fn insert(&mut self, name: Name, var: Rc<Variable<'ctx>>) {
        debug_assert!(!self.entries.contains_key(&name), "double registration");
        self.entries.insert(name, var);
    }

    /// Insert, shadowing any existing binding of the same name.
    pub fn insert_or_shadow(&mut self, name: Name, var: Rc<Variable<'ctx>>) {
        self.entries.insert(name, var);
    }

    pub fn get(&self, name: Name) -> Option<Rc<Variable<'ctx>>> {
        self.entries.get(&name).cloned()
    }

    pub fn contains(&self, name: Name) -> bool {
        self.entries.contains_key(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Rc<Variable<'ctx>>)> {
        self.entries.iter()
    }

    /// Compose `parent ⊕ local`, the local table shadowing the parent.
    pub fn merged(parent: &SymbolTable<'ctx>, local: &SymbolTable<'ctx>) -> SymbolTable<'ctx> {
        let mut merged = SymbolTable {
            entries: parent.entries.clone(),
        };
        for (name, var) in &local.entries {
            merged.entries.insert(*name, Rc::clone(var));
        }
        merged
    }
}
