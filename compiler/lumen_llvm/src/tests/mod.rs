//! End-to-end tests: source text through the full pipeline, checked by
//! JIT execution or by inspecting the emitted IR.

use std::path::Path;

use inkwell::context::Context;
use lumen_ir::StringInterner;

use crate::{CodeGenerator, CodegenOptions, CompileError};

mod ir;
mod jit;
mod mangling;

/// Compile a source string and run `main` under the JIT.
fn jit_run(source: &str) -> i32 {
    let context = Context::create();
    let interner = StringInterner::new();
    let mut generator = CodeGenerator::new(&context, &interner, CodegenOptions::default())
        .expect("target machine for the host");
    generator
        .compile_source(Path::new("test.lm"), source)
        .unwrap_or_else(|err| panic!("compilation failed: {err}"));
    generator.run_jit().unwrap_or_else(|err| panic!("jit failed: {err}"))
}

/// Compile a source string and return the module's textual IR.
fn compile_ir(source: &str) -> String {
    let context = Context::create();
    let interner = StringInterner::new();
    let mut generator = CodeGenerator::new(&context, &interner, CodegenOptions::default())
        .expect("target machine for the host");
    generator
        .compile_source(Path::new("test.lm"), source)
        .unwrap_or_else(|err| panic!("compilation failed: {err}"));
    generator.ir_text().join("\n")
}

/// Compile a source string, expecting failure.
fn compile_err(source: &str) -> CompileError {
    let context = Context::create();
    let interner = StringInterner::new();
    let mut generator = CodeGenerator::new(&context, &interner, CodegenOptions::default())
        .expect("target machine for the host");
    match generator.compile_source(Path::new("test.lm"), source) {
        Ok(()) => panic!("compilation unexpectedly succeeded"),
        Err(err) => err,
    }
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}
