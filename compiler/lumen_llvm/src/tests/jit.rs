use std::path::Path;

use inkwell::context::Context;
use lumen_ir::StringInterner;

use super::{compile_err, jit_run};
use crate::{CodeGenerator, CodegenOptions, CompileError};

#[test]
fn return_constant() {
    assert_eq!(jit_run("func main() -> i32 { ret 42; }"), 42);
}

#[test]
fn call_between_functions() {
    assert_eq!(
        jit_run(
            "func add(a: i32, b: i32) -> i32 { ret a + b; }\n\
             func main() -> i32 { ret add(20, 22); }"
        ),
        42
    );
}

#[test]
fn for_loop_counts() {
    assert_eq!(
        jit_run("func main() -> i32 { var mutable i = 0; for (; i < 10; ++i) {} ret i; }"),
        10
    );
}

#[test]
fn while_loop_sums() {
    assert_eq!(
        jit_run(
            "func main() -> i32 {\n\
             var mutable sum = 0;\n\
             var mutable i = 1;\n\
             while (i <= 4) { sum += i; ++i; }\n\
             ret sum;\n\
             }"
        ),
        10
    );
}

#[test]
fn unbounded_loop_with_break_and_continue() {
    assert_eq!(
        jit_run(
            "func main() -> i32 {\n\
             var mutable i = 0;\n\
             var mutable odd_sum = 0;\n\
             loop {\n\
                 ++i;\n\
                 if (i >= 10) { break; }\n\
                 if (i % 2 == 0) { continue; }\n\
                 odd_sum += i;\n\
             }\n\
             ret odd_sum;\n\
             }"
        ),
        25
    );
}

#[test]
fn main_returns_zero_without_ret() {
    assert_eq!(jit_run("func main() -> i32 { var x = 5; }"), 0);
}

#[test]
fn class_constructor_and_member() {
    assert_eq!(
        jit_run(
            "class Box {\n\
             var x: i32;\n\
             public:\n\
             func new(v: i32) { this.x = v; }\n\
             }\n\
             func main() -> i32 { var b = Box(42); ret b.x; }"
        ),
        42
    );
}

#[test]
fn method_call() {
    assert_eq!(
        jit_run(
            "class Counter {\n\
             var n: i32;\n\
             public:\n\
             func new(v: i32) { this.n = v; }\n\
             func doubled() -> i32 { ret this.n * 2; }\n\
             }\n\
             func main() -> i32 { var c = Counter(21); ret c.doubled(); }"
        ),
        42
    );
}

#[test]
fn field_defaults_apply_in_constructor() {
    assert_eq!(
        jit_run(
            "class Settings {\n\
             var verbosity: i32 = 3;\n\
             }\n\
             func main() -> i32 { var s = Settings(); ret s.verbosity; }"
        ),
        3
    );
}

#[test]
fn function_template_instantiation() {
    assert_eq!(
        jit_run(
            "func id<T>(x: T) -> T { ret x; }\n\
             func main() -> i32 { ret id<i32>(7); }"
        ),
        7
    );
}

#[test]
fn class_template_instantiation() {
    assert_eq!(
        jit_run(
            "class Pair<T> {\n\
             var a: T;\n\
             var b: T;\n\
             public:\n\
             func new(x: T, y: T) { this.a = x; this.b = y; }\n\
             func sum() -> T { ret this.a + this.b; }\n\
             }\n\
             func main() -> i32 { var p = Pair<i32>(20, 22); ret p.sum(); }"
        ),
        42
    );
}

#[test]
fn namespaced_function_resolves() {
    assert_eq!(
        jit_run(
            "namespace math {\n\
             func square(x: i32) -> i32 { ret x * x; }\n\
             }\n\
             func main() -> i32 { ret math::square(6) + 6; }"
        ),
        42
    );
}

#[test]
fn match_selects_first_hit() {
    assert_eq!(
        jit_run(
            "func classify(x: i32) -> i32 {\n\
             match (x) {\n\
                 1 => ret 10;,\n\
                 2 => ret 20;,\n\
                 _ => ret 0;\n\
             }\n\
             ret 1;\n\
             }\n\
             func main() -> i32 { ret classify(2) + classify(7); }"
        ),
        20
    );
}

#[test]
fn union_tag_match() {
    assert_eq!(
        jit_run(
            "union Number { int_: i64, float_: f64 }\n\
             func kind_of(n: Number) -> i32 {\n\
             match (n) {\n\
                 Number::int_ => ret 1;,\n\
                 Number::float_ => ret 2;\n\
             }\n\
             ret 0;\n\
             }\n\
             func main() -> i32 { ret kind_of(Number::float_(1.5)) * 10 + kind_of(Number::int_(3l)); }"
        ),
        21
    );
}

#[test]
fn pointer_roundtrip() {
    // *&x == x
    assert_eq!(
        jit_run(
            "func main() -> i32 {\n\
             var mutable x = 42;\n\
             var p = &x;\n\
             ret *p;\n\
             }"
        ),
        42
    );
}

#[test]
fn heap_allocation_roundtrip() {
    assert_eq!(
        jit_run(
            "func main() -> i32 {\n\
             var p = new i32();\n\
             *p = 7;\n\
             var v = *p;\n\
             delete p;\n\
             ret v;\n\
             }"
        ),
        7
    );
}

#[test]
fn reference_parameter_writes_through() {
    assert_eq!(
        jit_run(
            "func set(mutable r: &i32) { r = 42; }\n\
             func main() -> i32 {\n\
             var mutable x = 0;\n\
             set(ref x);\n\
             ret x;\n\
             }"
        ),
        42
    );
}

#[test]
fn cast_to_own_type_is_identity() {
    assert_eq!(
        jit_run("func main() -> i32 { var e = 42; ret e as i32; }"),
        42
    );
}

#[test]
fn integer_promotion_and_narrow_cast() {
    assert_eq!(
        jit_run(
            "func main() -> i32 {\n\
             var wide = 300l;\n\
             var small = wide as i8;\n\
             ret small as i32;\n\
             }"
        ),
        44
    );
}

#[test]
fn sizeof_builtin() {
    assert_eq!(
        jit_run("func main() -> i32 { ret sizeof(i32) as i32; }"),
        4
    );
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(
        jit_run(
            "func boom() -> bool { var p: *i32 = null; ret *p == 0; }\n\
             func main() -> i32 {\n\
             if (false && boom()) { ret 1; }\n\
             if (true || boom()) { ret 42; }\n\
             ret 2;\n\
             }"
        ),
        42
    );
}

#[test]
fn shadowing_in_nested_scope() {
    assert_eq!(
        jit_run(
            "func main() -> i32 {\n\
             var x = 1;\n\
             {\n\
                 var x = 41;\n\
                 if (x != 41) { ret 0; }\n\
             }\n\
             ret x + 41;\n\
             }"
        ),
        42
    );
}

#[test]
fn pipeline_feeds_first_argument() {
    assert_eq!(
        jit_run(
            "func scale(x: i32, by: i32) -> i32 { ret x * by; }\n\
             func main() -> i32 { ret 21 |> scale(2); }"
        ),
        42
    );
}

#[test]
fn overloads_resolve_by_parameter_types() {
    assert_eq!(
        jit_run(
            "func pick(x: i32) -> i32 { ret 1; }\n\
             func pick(x: i64) -> i32 { ret 2; }\n\
             func main() -> i32 { ret pick(1) * 10 + pick(2l); }"
        ),
        12
    );
}

#[test]
fn typedef_resolves() {
    assert_eq!(
        jit_run(
            "typedef Int = i32;\n\
             func main() -> i32 { var x: Int = 42; ret x; }"
        ),
        42
    );
}

#[test]
fn array_literal_and_subscript() {
    assert_eq!(
        jit_run(
            "func main() -> i32 {\n\
             var xs = [40, 1, 1];\n\
             ret xs[0] + xs[1] + xs[2];\n\
             }"
        ),
        42
    );
}

#[test]
fn parse_errors_batch_and_fail() {
    let err = compile_err(
        "func main() -> i32 {\n\
         var = 1;\n\
         var ok = 2;\n\
         ret +;\n\
         }",
    );
    match err {
        CompileError::Parse { count, .. } => assert_eq!(count, 2),
        other => panic!("expected a parse failure, got {other}"),
    }
}

#[test]
fn unknown_variable_is_a_codegen_error() {
    let err = compile_err("func main() -> i32 { ret missing; }");
    match err {
        CompileError::Codegen(inner) => {
            assert!(inner.message.contains("unknown variable"));
            // Formatted with file, position, and a caret line.
            assert!(inner.message.contains("test.lm:1:"));
            assert!(inner.message.contains('^'));
        }
        other => panic!("expected a codegen error, got {other}"),
    }
}

#[test]
fn assignment_to_immutable_is_rejected() {
    let err = compile_err("func main() -> i32 { var x = 1; x = 2; ret x; }");
    match err {
        CompileError::Codegen(inner) => {
            assert!(inner.message.contains("read-only"));
        }
        other => panic!("expected a codegen error, got {other}"),
    }
}

#[test]
fn imports_compile_into_one_module() {
    let dir = tempfile::tempdir().expect("temp dir");
    let util = dir.path().join("util.lm");
    std::fs::write(&util, "public func forty() -> i32 { ret 40; }\n").expect("write util");
    let root = dir.path().join("main.lm");
    std::fs::write(
        &root,
        "import \"util\";\nfunc main() -> i32 { ret forty() + 2; }\n",
    )
    .expect("write main");

    let context = Context::create();
    let interner = StringInterner::new();
    let mut generator = CodeGenerator::new(&context, &interner, CodegenOptions::default())
        .expect("target machine for the host");
    generator.compile_file(&root).expect("compiles with import");
    assert_eq!(generator.run_jit().expect("jit runs"), 42);
}

#[test]
fn object_file_emission() {
    let dir = tempfile::tempdir().expect("temp dir");
    let context = Context::create();
    let interner = StringInterner::new();
    let mut generator = CodeGenerator::new(
        &context,
        &interner,
        CodegenOptions {
            output_dir: Some(dir.path().to_path_buf()),
            ..CodegenOptions::default()
        },
    )
    .expect("target machine for the host");
    generator
        .compile_source(Path::new("prog.lm"), "func main() -> i32 { ret 42; }")
        .expect("compiles");

    let outputs = generator.emit_object_files().expect("emits objects");
    assert_eq!(outputs.len(), 1);
    let metadata = std::fs::metadata(&outputs[0]).expect("object file exists");
    assert!(metadata.len() > 0);
}

#[test]
fn optimized_build_still_runs() {
    let context = Context::create();
    let interner = StringInterner::new();
    let mut generator = CodeGenerator::new(
        &context,
        &interner,
        CodegenOptions {
            opt_level: 2,
            ..CodegenOptions::default()
        },
    )
    .expect("target machine for the host");
    generator
        .compile_source(
            Path::new("test.lm"),
            "func add(a: i32, b: i32) -> i32 { ret a + b; }\n\
             func main() -> i32 { ret add(40, 2); }",
        )
        .expect("compiles");
    assert_eq!(generator.run_jit().expect("jit runs"), 42);
}
