//! Top-level items: functions, classes, unions, typedefs, imports,
//! namespaces, with their attribute sets.

use crate::ast::ty::ParsedType;
use crate::{Name, Span};

use super::StmtId;

/// Attributes from a `[[...]]` list preceding a top-level item.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AttrSet {
    pub nodiscard: bool,
    pub nomangle: bool,
}

/// Method accessibility, also encoded into mangled names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Accessibility {
    /// A free function, not a member of any class.
    NonMethod,
    Public,
    Private,
}

impl Accessibility {
    pub fn is_externally_accessible(self) -> bool {
        !matches!(self, Accessibility::Private)
    }
}

/// Default accessibility of class members before any access specifier.
pub const CLASS_DEFAULT_ACCESSIBILITY: Accessibility = Accessibility::Public;

/// A function parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Name,
    pub is_mutable: bool,
    pub ty: ParsedType,
    pub span: Span,
}

/// Parameter list; `is_vararg` marks a trailing `...`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamList {
    pub params: Vec<Param>,
    pub is_vararg: bool,
}

/// A function signature. Shared by declarations, definitions, methods,
/// constructors, and destructors.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Name,
    /// Template parameter names; non-empty makes this a template.
    pub template_params: Vec<Name>,
    pub params: ParamList,
    pub return_ty: ParsedType,
    pub accessibility: Accessibility,
    pub is_constructor: bool,
    pub is_destructor: bool,
    pub span: Span,
}

impl FunctionDecl {
    pub fn is_template(&self) -> bool {
        !self.template_params.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub is_public: bool,
    pub decl: FunctionDecl,
    pub body: StmtId,
}

/// A field of a class body (`var name: T [= default];`).
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub name: Name,
    pub ty: ParsedType,
    pub init: Option<super::ExprId>,
    pub span: Span,
}

/// One entry of a class body, in declaration order. `Access` entries
/// switch the accessibility of everything that follows.
#[derive(Clone, Debug, PartialEq)]
pub enum ClassMember {
    Field(FieldDef),
    Method(FunctionDef),
    Constructor(FunctionDef),
    Destructor(FunctionDef),
    Access(Accessibility),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDef {
    pub is_public: bool,
    pub name: Name,
    pub template_params: Vec<Name>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

impl ClassDef {
    pub fn is_template(&self) -> bool {
        !self.template_params.is_empty()
    }
}

/// A tagged-union variant: `tag: T`.
#[derive(Clone, Debug, PartialEq)]
pub struct UnionTag {
    pub name: Name,
    pub ty: ParsedType,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnionDef {
    pub is_public: bool,
    pub name: Name,
    pub template_params: Vec<Name>,
    pub tags: Vec<UnionTag>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ItemKind {
    /// `extern func name(params) -> T;`
    FunctionDecl(FunctionDecl),
    FunctionDef(FunctionDef),
    /// `class Name;` — opaque forward declaration.
    ClassDecl(Name),
    ClassDef(ClassDef),
    UnionDef(UnionDef),
    /// `typedef Alias = T;`
    Typedef { alias: Name, ty: ParsedType },
    /// `import "path";` — file-scoped, top level only.
    Import { path: Name },
    Namespace { name: Name, items: Vec<Item> },
}

/// A top-level item with its attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub attrs: AttrSet,
    pub kind: ItemKind,
    pub span: Span,
}

/// One parsed source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TranslationUnit {
    pub items: Vec<Item>,
}
