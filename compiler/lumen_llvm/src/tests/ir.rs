//! Assertions over the emitted textual IR: destructor scheduling,
//! template memoization, boolean representation.

use super::{compile_ir, count_occurrences};

#[test]
fn destructor_runs_exactly_once_on_scope_exit() {
    let ir = compile_ir(
        "class Box {\n\
         var x: i32;\n\
         public:\n\
         func new(v: i32) { this.x = v; }\n\
         }\n\
         func main() -> i32 { var b = Box(42); ret b.x; }",
    );
    // The default destructor is synthesized and invoked exactly once.
    assert!(ir.contains("define void @_LC3Box6deleteD1Pv"));
    assert_eq!(count_occurrences(&ir, "call void @_LC3Box6deleteD1Pv"), 1);
}

#[test]
fn destructors_run_in_reverse_declaration_order() {
    let ir = compile_ir(
        "class First {\n\
         var n: i32;\n\
         public:\n\
         func delete() { this.n = 0; }\n\
         }\n\
         class Second {\n\
         var n: i32;\n\
         public:\n\
         func delete() { this.n = 0; }\n\
         }\n\
         func main() -> i32 {\n\
         var a = First { 1 };\n\
         var b = Second { 2 };\n\
         ret 0;\n\
         }",
    );
    let second_call = ir
        .find("call void @_LC6Second6deleteD1Pv")
        .expect("Second's destructor is called");
    let first_call = ir
        .find("call void @_LC5First6deleteD1Pv")
        .expect("First's destructor is called");
    assert!(
        second_call < first_call,
        "the later declaration must be destroyed first"
    );
}

#[test]
fn early_return_routes_through_destructors() {
    let ir = compile_ir(
        "class Guard {\n\
         var n: i32;\n\
         public:\n\
         func delete() { this.n = 0; }\n\
         }\n\
         func probe(flag: i32) -> i32 {\n\
         var g = Guard { 1 };\n\
         if (flag != 0) { ret 1; }\n\
         ret 2;\n\
         }\n\
         func main() -> i32 { ret probe(0); }",
    );
    // Both the early return and the tail return drain the scope.
    assert_eq!(count_occurrences(&ir, "call void @_LC5Guard6deleteD1Pv"), 2);
    assert!(ir.contains("destruct"));
}

#[test]
fn break_drains_loop_scope() {
    let ir = compile_ir(
        "class Guard {\n\
         var n: i32;\n\
         public:\n\
         func delete() { this.n = 0; }\n\
         }\n\
         func main() -> i32 {\n\
         loop {\n\
             var g = Guard { 1 };\n\
             break;\n\
         }\n\
         ret 0;\n\
         }",
    );
    assert_eq!(count_occurrences(&ir, "call void @_LC5Guard6deleteD1Pv"), 1);
}

#[test]
fn template_instantiation_is_memoized() {
    let ir = compile_ir(
        "func id<T>(x: T) -> T { ret x; }\n\
         func main() -> i32 { ret id<i32>(1) + id<i32>(2) + id<i64>(3l) as i32; }",
    );
    // Two i32 uses share one symbol; the i64 use gets its own.
    assert_eq!(count_occurrences(&ir, "define i32 @_L5idIiEFi"), 1);
    assert_eq!(count_occurrences(&ir, "define i64 @_L5idIlEFl"), 1);
    assert_eq!(count_occurrences(&ir, "call i32 @_L5idIiEFi"), 2);
}

#[test]
fn class_template_instantiation_is_memoized() {
    let ir = compile_ir(
        "class Cell<T> {\n\
         var v: T;\n\
         public:\n\
         func new(v: T) { this.v = v; }\n\
         }\n\
         func main() -> i32 {\n\
         var a = Cell<i32>(1);\n\
         var b = Cell<i32>(2);\n\
         ret a.v + b.v;\n\
         }",
    );
    // A single named struct for Cell<i32>.
    assert_eq!(count_occurrences(&ir, "%\"Cell<i32>\" = type"), 1);
}

#[test]
fn booleans_are_bytes() {
    let ir = compile_ir("func truth() -> bool { ret 1 < 2; }\nfunc main() -> i32 { ret 0; }");
    assert!(ir.contains("define i8 @"));
    // No 1-bit boolean escapes into a stored value.
    assert!(!ir.contains("alloca i1"));
}

#[test]
fn nomangle_keeps_source_name() {
    let ir = compile_ir(
        "[[nomangle]] func answer() -> i32 { ret 42; }\n\
         func main() -> i32 { ret answer(); }",
    );
    assert!(ir.contains("define i32 @answer"));
}

#[test]
fn private_functions_get_internal_linkage() {
    let ir = compile_ir(
        "private func helper() -> i32 { ret 1; }\n\
         func main() -> i32 { ret helper(); }",
    );
    assert!(ir.contains("define internal i32 @"));
}

#[test]
fn string_literals_are_utf32_globals() {
    let ir = compile_ir(
        "func main() -> i32 { var s = \"hi\"; ret 0; }",
    );
    // Two code points plus the terminator.
    assert!(ir.contains("[3 x i32]"));
}
