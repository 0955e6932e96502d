//! Semantic type model.
//!
//! [`Ty`] is the resolved shape of a type after alias lookup and
//! template substitution. User-defined types are *handles* (interned
//! qualified names) resolved through the class/union registries at use
//! sites, which is what lets classes contain pointers to themselves.
//!
//! Booleans map to `i8` in the back end; a 1-bit integer has no usable
//! signedness, so the byte form is used for every boolean-producing
//! operation.

use std::fmt;

use inkwell::types::{BasicType, BasicTypeEnum};
use lumen_ir::ast::BuiltinKind;
use lumen_ir::{Name, Span};

use crate::context::CodegenCx;
use crate::error::CodegenError;

/// Signedness classification used by promotion, comparison, division,
/// and cast lowering.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SignKind {
    /// Arrays, classes, pointers.
    NoSign,
    Unsigned,
    Signed,
}

/// A resolved type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Builtin(BuiltinKind),
    /// Class or union handle; the `Name` is the interned qualified name
    /// keying the registries.
    UserDefined(Name),
    Array { element: Box<Ty>, size: u64 },
    Pointer { pointee: Box<Ty>, depth: u32 },
    Reference(Box<Ty>),
}

impl Ty {
    pub const VOID: Ty = Ty::Builtin(BuiltinKind::Void);
    pub const BOOL: Ty = Ty::Builtin(BuiltinKind::Bool);
    pub const I32: Ty = Ty::Builtin(BuiltinKind::I32);
    pub const U64: Ty = Ty::Builtin(BuiltinKind::U64);

    pub fn pointer_to(pointee: Ty) -> Ty {
        match pointee {
            Ty::Pointer { pointee, depth } => Ty::Pointer {
                pointee,
                depth: depth + 1,
            },
            other => Ty::Pointer {
                pointee: Box::new(other),
                depth: 1,
            },
        }
    }

    /// Strip one pointer level.
    pub fn pointee(&self) -> Option<Ty> {
        match self {
            Ty::Pointer { pointee, depth } => Some(if *depth > 1 {
                Ty::Pointer {
                    pointee: pointee.clone(),
                    depth: depth - 1,
                }
            } else {
                (**pointee).clone()
            }),
            _ => None,
        }
    }

    /// References are transparent when a value is used as an operand.
    pub fn strip_ref(&self) -> &Ty {
        match self {
            Ty::Reference(inner) => inner.strip_ref(),
            other => other,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Ty::Builtin(BuiltinKind::Void))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.strip_ref(), Ty::Pointer { .. })
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Ty::Reference(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self.strip_ref(),
            Ty::Builtin(BuiltinKind::F32 | BuiltinKind::F64)
        )
    }

    /// Integer in the operational sense: includes `bool` (a byte) and
    /// `char` (a code point).
    pub fn is_integer(&self) -> bool {
        matches!(
            self.strip_ref(),
            Ty::Builtin(
                BuiltinKind::Bool
                    | BuiltinKind::I8
                    | BuiltinKind::U8
                    | BuiltinKind::I16
                    | BuiltinKind::U16
                    | BuiltinKind::I32
                    | BuiltinKind::U32
                    | BuiltinKind::I64
                    | BuiltinKind::U64
                    | BuiltinKind::Char
            )
        )
    }

    pub fn sign_kind(&self) -> SignKind {
        match self.strip_ref() {
            Ty::Builtin(kind) => match kind {
                BuiltinKind::I8 | BuiltinKind::I16 | BuiltinKind::I32 | BuiltinKind::I64 => {
                    SignKind::Signed
                }
                BuiltinKind::Bool
                | BuiltinKind::U8
                | BuiltinKind::U16
                | BuiltinKind::U32
                | BuiltinKind::U64
                | BuiltinKind::Char => SignKind::Unsigned,
                BuiltinKind::Void | BuiltinKind::F32 | BuiltinKind::F64 => SignKind::NoSign,
            },
            _ => SignKind::NoSign,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.sign_kind() == SignKind::Signed
    }

    /// Bit width of an integer type.
    pub fn int_width(&self) -> Option<u32> {
        match self.strip_ref() {
            Ty::Builtin(kind) => match kind {
                BuiltinKind::Bool | BuiltinKind::I8 | BuiltinKind::U8 => Some(8),
                BuiltinKind::I16 | BuiltinKind::U16 => Some(16),
                BuiltinKind::I32 | BuiltinKind::U32 | BuiltinKind::Char => Some(32),
                BuiltinKind::I64 | BuiltinKind::U64 => Some(64),
                _ => None,
            },
            _ => None,
        }
    }

    /// The integer builtin with the given width and signedness.
    pub fn int_with(width: u32, signed: bool) -> Ty {
        let kind = match (width, signed) {
            (8, true) => BuiltinKind::I8,
            (8, false) => BuiltinKind::U8,
            (16, true) => BuiltinKind::I16,
            (16, false) => BuiltinKind::U16,
            (32, true) => BuiltinKind::I32,
            (32, false) => BuiltinKind::U32,
            (64, true) => BuiltinKind::I64,
            _ => BuiltinKind::U64,
        };
        Ty::Builtin(kind)
    }

    /// Render for diagnostics and instantiated-type registry keys.
    pub fn display(&self, cx: &CodegenCx) -> String {
        match self {
            Ty::Builtin(kind) => kind.as_str().to_owned(),
            Ty::UserDefined(name) => cx.interner.lookup(*name).to_owned(),
            Ty::Array { element, size } => format!("{}[{size}]", element.display(cx)),
            Ty::Pointer { pointee, depth } => {
                format!("{}{}", "*".repeat(*depth as usize), pointee.display(cx))
            }
            Ty::Reference(inner) => format!("&{}", inner.display(cx)),
        }
    }
}

impl fmt::Display for SignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignKind::NoSign => f.write_str("no-sign"),
            SignKind::Unsigned => f.write_str("unsigned"),
            SignKind::Signed => f.write_str("signed"),
        }
    }
}

/// Structural equality with reference transparency on both sides.
pub fn equals(a: &Ty, b: &Ty) -> bool {
    a.strip_ref() == b.strip_ref()
}

/// The implicit integer promotion for a binary operator: the result is
/// the wider type, keeping the signedness of the wider operand;
/// unsigned wins when the widths tie.
pub fn promote(lhs: &Ty, rhs: &Ty) -> Option<Ty> {
    let (lw, rw) = (lhs.int_width()?, rhs.int_width()?);
    let ty = if lw > rw {
        Ty::int_with(lw, lhs.is_signed())
    } else if rw > lw {
        Ty::int_with(rw, rhs.is_signed())
    } else {
        Ty::int_with(lw, lhs.is_signed() && rhs.is_signed())
    };
    Some(ty)
}

impl<'ctx> CodegenCx<'ctx> {
    /// Memoized, injective mapping from [`Ty`] to the back end's type.
    ///
    /// `bool` maps to `i8`; `char` to `i32`; classes and unions to
    /// their registered named struct types.
    pub fn llvm_type(&self, ty: &Ty) -> Result<BasicTypeEnum<'ctx>, CodegenError> {
        if let Some(cached) = self.type_cache.borrow().get(ty) {
            return Ok(*cached);
        }

        let built: BasicTypeEnum<'ctx> = match ty {
            Ty::Builtin(kind) => match kind {
                BuiltinKind::Void => {
                    return Err(CodegenError::new("'void' is not a value type"))
                }
                BuiltinKind::Bool | BuiltinKind::I8 | BuiltinKind::U8 => {
                    self.llcx.i8_type().into()
                }
                BuiltinKind::I16 | BuiltinKind::U16 => self.llcx.i16_type().into(),
                BuiltinKind::I32 | BuiltinKind::U32 | BuiltinKind::Char => {
                    self.llcx.i32_type().into()
                }
                BuiltinKind::I64 | BuiltinKind::U64 => self.llcx.i64_type().into(),
                BuiltinKind::F32 => self.llcx.f32_type().into(),
                BuiltinKind::F64 => self.llcx.f64_type().into(),
            },
            Ty::UserDefined(name) => {
                let key = self.interner.lookup(*name);
                if let Some(class) = self.classes.borrow().get(key) {
                    if class.is_opaque {
                        return Err(CodegenError::new(format!(
                            "class '{key}' is declared but not defined"
                        )));
                    }
                    class.ll.into()
                } else if let Some(union) = self.unions.borrow().get(key) {
                    union.ll.into()
                } else {
                    return Err(CodegenError::new(format!("unknown type '{key}'")));
                }
            }
            Ty::Array { element, size } => {
                let elem = self.llvm_type(element)?;
                elem.array_type(u32::try_from(*size).map_err(|_| {
                    CodegenError::new(format!("array size {size} is out of range"))
                })?)
                .into()
            }
            Ty::Pointer { .. } | Ty::Reference(_) => self.ptr_type.into(),
        };

        self.type_cache.borrow_mut().insert(ty.clone(), built);
        Ok(built)
    }

    /// ABI size of a type per the selected target's data layout.
    pub fn abi_size(&self, ty: &Ty) -> Result<u64, CodegenError> {
        let ll = self.llvm_type(ty)?;
        Ok(self.target_data.get_abi_size(&ll))
    }

    /// Resolve a parsed type annotation to a semantic type.
    ///
    /// Resolution order for a bare name: template arguments in scope,
    /// then aliases, classes, and unions under each namespace prefix
    /// from innermost outward. Class-template references instantiate
    /// (memoized) on the spot.
    pub fn create_ty(
        &self,
        parsed: &lumen_ir::ast::ParsedType,
        span: Span,
    ) -> Result<Ty, CodegenError> {
        use lumen_ir::ast::ParsedType;

        match parsed {
            ParsedType::Builtin(kind) => Ok(Ty::Builtin(*kind)),
            ParsedType::UserDefined(name) => self.resolve_named_ty(*name, span),
            ParsedType::Template { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.create_ty(arg, span))
                    .collect::<Result<Vec<_>, _>>()?;
                self.instantiate_class_template(*name, args, span)
            }
            ParsedType::Array { element, size } => Ok(Ty::Array {
                element: Box::new(self.create_ty(element, span)?),
                size: *size,
            }),
            ParsedType::Pointer { pointee, depth } => Ok(Ty::Pointer {
                pointee: Box::new(self.create_ty(pointee, span)?),
                depth: *depth,
            }),
            ParsedType::Reference(inner) => Ok(Ty::Reference(Box::new(
                self.create_ty(inner, span)?,
            ))),
        }
    }

    fn resolve_named_ty(&self, name: Name, span: Span) -> Result<Ty, CodegenError> {
        if let Some(ty) = self.template_arg(name) {
            return Ok(ty);
        }

        let text = self.interner.lookup(name);
        let ns = self.ns.borrow().clone();
        for depth in (0..=ns.len()).rev() {
            let qualified = ns.prefix(depth).qualify(self.interner, text);
            if let Some(ty) = self.aliases.borrow().get(qualified.as_str()) {
                return Ok(ty.clone());
            }
            if self.classes.borrow().contains_key(qualified.as_str())
                || self.unions.borrow().contains_key(qualified.as_str())
            {
                return Ok(Ty::UserDefined(self.interner.intern(&qualified)));
            }
        }

        Err(self.error(span, format!("unknown type name '{text}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_prefers_wider_operand() {
        let ty = promote(&Ty::Builtin(BuiltinKind::I16), &Ty::Builtin(BuiltinKind::U64))
            .expect("integers promote");
        assert_eq!(ty, Ty::Builtin(BuiltinKind::U64));

        let ty = promote(&Ty::Builtin(BuiltinKind::I64), &Ty::Builtin(BuiltinKind::U8))
            .expect("integers promote");
        assert_eq!(ty, Ty::Builtin(BuiltinKind::I64));
    }

    #[test]
    fn promotion_ties_go_unsigned() {
        let ty = promote(&Ty::Builtin(BuiltinKind::I32), &Ty::Builtin(BuiltinKind::U32))
            .expect("integers promote");
        assert_eq!(ty, Ty::Builtin(BuiltinKind::U32));

        let ty = promote(&Ty::Builtin(BuiltinKind::I32), &Ty::Builtin(BuiltinKind::I32))
            .expect("integers promote");
        assert_eq!(ty, Ty::Builtin(BuiltinKind::I32));
    }

    #[test]
    fn floats_do_not_promote() {
        assert!(promote(&Ty::Builtin(BuiltinKind::F64), &Ty::Builtin(BuiltinKind::I32)).is_none());
    }

    #[test]
    fn reference_transparency() {
        let ref_i32 = Ty::Reference(Box::new(Ty::I32));
        assert!(equals(&ref_i32, &Ty::I32));
        assert_ne!(ref_i32, Ty::I32);
    }

    #[test]
    fn pointer_depth() {
        let pp = Ty::pointer_to(Ty::pointer_to(Ty::I32));
        assert_eq!(
            pp.pointee(),
            Some(Ty::Pointer {
                pointee: Box::new(Ty::I32),
                depth: 1
            })
        );
    }
}
