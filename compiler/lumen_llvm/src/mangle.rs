//! Name mangling.
//!
//! Mangled names are deterministic encodings of the namespace path
//! (`N` segments for namespaces, `C` for classes), the function name,
//! its accessibility, and its parameter types. Overloads are
//! distinguished entirely by parameter signatures; constructors and
//! destructors carry reserved suffixes. `main` and `nomangle`/`extern`
//! functions keep their source names verbatim.

use lumen_ir::ast::{Accessibility, BuiltinKind};

use crate::context::{CodegenCx, Namespace, NamespaceKind, NamespaceStack};
use crate::types::Ty;

const PREFIX: &str = "_L";

fn push_segment(out: &mut String, seg: &str) {
    out.push_str(&seg.len().to_string());
    out.push_str(seg);
}

fn access_tag(access: Accessibility) -> char {
    match access {
        Accessibility::NonMethod => 'F',
        Accessibility::Public => 'P',
        Accessibility::Private => 'V',
    }
}

/// Signature fragment for one type.
pub fn type_sig(cx: &CodegenCx, ty: &Ty) -> String {
    match ty {
        Ty::Builtin(kind) => match kind {
            BuiltinKind::Void => "v",
            BuiltinKind::Bool => "b",
            BuiltinKind::I8 => "a",
            BuiltinKind::U8 => "h",
            BuiltinKind::I16 => "s",
            BuiltinKind::U16 => "t",
            BuiltinKind::I32 => "i",
            BuiltinKind::U32 => "j",
            BuiltinKind::I64 => "l",
            BuiltinKind::U64 => "m",
            BuiltinKind::F32 => "f",
            BuiltinKind::F64 => "d",
            BuiltinKind::Char => "w",
        }
        .to_owned(),
        Ty::UserDefined(name) => {
            let mut out = String::new();
            push_segment(&mut out, cx.interner.lookup(*name));
            out
        }
        Ty::Array { element, size } => format!("A{size}_{}", type_sig(cx, element)),
        Ty::Pointer { pointee, depth } => {
            format!("{}{}", "P".repeat(*depth as usize), type_sig(cx, pointee))
        }
        Ty::Reference(inner) => format!("R{}", type_sig(cx, inner)),
    }
}

/// Mangle a function symbol under the given namespace path.
pub fn mangle_function(
    cx: &CodegenCx,
    ns: &NamespaceStack,
    name: &str,
    access: Accessibility,
    params: &[Ty],
    is_constructor: bool,
    is_destructor: bool,
) -> String {
    let mut out = String::from(PREFIX);

    for Namespace { name: seg, kind } in ns.iter() {
        out.push(match kind {
            NamespaceKind::Namespace => 'N',
            NamespaceKind::Class => 'C',
        });
        push_segment(&mut out, cx.interner.lookup(*seg));
    }

    push_segment(&mut out, name);
    if is_constructor {
        out.push_str("C1");
    } else if is_destructor {
        out.push_str("D1");
    }
    out.push(access_tag(access));

    if params.is_empty() {
        out.push('v');
    } else {
        for param in params {
            out.push_str(&type_sig(cx, param));
        }
    }

    out
}
