//! Mangled-name shape and injectivity, observed through the emitted
//! module's symbols.

use super::compile_ir;

#[test]
fn overloads_get_distinct_symbols() {
    let ir = compile_ir(
        "func pick(x: i32) -> i32 { ret 1; }\n\
         func pick(x: i64) -> i32 { ret 2; }\n\
         func main() -> i32 { ret pick(1) + pick(2l); }",
    );
    assert!(ir.contains("@_L4pickFi"));
    assert!(ir.contains("@_L4pickFl"));
}

#[test]
fn namespace_segments_are_tagged() {
    let ir = compile_ir(
        "namespace math {\n\
         func square(x: i32) -> i32 { ret x * x; }\n\
         }\n\
         func main() -> i32 { ret math::square(2); }",
    );
    assert!(ir.contains("@_LN4math6squareFi"));
}

#[test]
fn class_segments_and_reserved_suffixes() {
    let ir = compile_ir(
        "class Counter {\n\
         var n: i32;\n\
         public:\n\
         func new(v: i32) { this.n = v; }\n\
         func get() -> i32 { ret this.n; }\n\
         }\n\
         func main() -> i32 { var c = Counter(1); ret c.get(); }",
    );
    // Constructor carries the C1 suffix, destructor D1; methods are
    // tagged with the class segment and their accessibility.
    assert!(ir.contains("@_LC7Counter3newC1Pi"));
    assert!(ir.contains("@_LC7Counter3getPv"));
    assert!(ir.contains("@_LC7Counter6deleteD1Pv"));
}

#[test]
fn same_name_in_different_namespaces_stays_distinct() {
    let ir = compile_ir(
        "namespace a { func f() -> i32 { ret 1; } }\n\
         namespace b { func f() -> i32 { ret 2; } }\n\
         func main() -> i32 { ret a::f() + b::f(); }",
    );
    assert!(ir.contains("@_LN1a1fFv"));
    assert!(ir.contains("@_LN1b1fFv"));
}

#[test]
fn main_is_never_mangled() {
    let ir = compile_ir("func main() -> i32 { ret 0; }");
    assert!(ir.contains("define i32 @main"));
}

#[test]
fn pointer_and_array_parameters_encode() {
    let ir = compile_ir(
        "func peek(p: *i8) -> i32 { ret 0; }\n\
         func first(xs: i32[4]) -> i32 { ret xs[0]; }\n\
         func main() -> i32 { ret 0; }",
    );
    assert!(ir.contains("@_L4peekFPa"));
    assert!(ir.contains("@_L5firstFA4_i"));
}
