//! Lumen compiler CLI.
//!
//! ```text
//! lumenc [options] <file.lm>...
//!   --emit=obj|asm|ir|jit   emission mode (default: obj)
//!   -O<n>                   optimization level 0-3 (default: 0)
//!   --target=<triple>       target triple override
//!   --relocation-model=static|pic
//!   -o <dir>                output directory
//! ```
//!
//! Exit codes: 0 on success; 1 on parse, type/name, back-end, or I/O
//! failure. JIT mode exits with `main`'s return value.

use std::path::PathBuf;
use std::process::ExitCode;

use inkwell::context::Context;
use lumen_ir::StringInterner;
use lumen_llvm::{CodeGenerator, CodegenOptions, CompileError, RelocModel};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, PartialEq, Eq)]
enum Emit {
    Object,
    Assembly,
    Ir,
    Jit,
}

struct Args {
    inputs: Vec<PathBuf>,
    emit: Emit,
    options: CodegenOptions,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("lumenc: {message}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let context = Context::create();
    let interner = StringInterner::new();
    let mut generator = match CodeGenerator::new(&context, &interner, args.options.clone()) {
        Ok(generator) => generator,
        Err(err) => {
            eprintln!("lumenc: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Compile every unit before reporting, so one bad file does not
    // hide errors in the others.
    let mut failed = false;
    for input in &args.inputs {
        if let Err(err) = generator.compile_file(input) {
            report(&err);
            failed = true;
        }
    }
    if failed {
        return ExitCode::FAILURE;
    }

    let emitted = match args.emit {
        Emit::Object => generator.emit_object_files(),
        Emit::Assembly => generator.emit_assembly_files(),
        Emit::Ir => generator.emit_ir_files(),
        Emit::Jit => {
            return match generator.run_jit() {
                Ok(status) => ExitCode::from(status as u8),
                Err(err) => {
                    report(&err);
                    ExitCode::FAILURE
                }
            };
        }
    };

    match emitted {
        Ok(outputs) => {
            for output in outputs {
                println!("{}", output.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn report(err: &CompileError) {
    if let CompileError::Parse { messages, count, .. } = err {
        for message in messages {
            eprintln!("{message}");
        }
        eprintln!("{count} errors generated.");
    } else {
        eprintln!("{err}");
    }
}

fn parse_args() -> Result<Args, String> {
    let mut inputs = Vec::new();
    let mut emit = Emit::Object;
    let mut options = CodegenOptions::default();

    let mut argv = std::env::args().skip(1);
    while let Some(arg) = argv.next() {
        if let Some(mode) = arg.strip_prefix("--emit=") {
            emit = match mode {
                "obj" => Emit::Object,
                "asm" => Emit::Assembly,
                "ir" => Emit::Ir,
                "jit" => Emit::Jit,
                other => return Err(format!("unknown emission mode '{other}'")),
            };
        } else if let Some(level) = arg.strip_prefix("-O") {
            options.opt_level = level
                .parse::<u32>()
                .ok()
                .filter(|level| *level <= 3)
                .ok_or_else(|| format!("invalid optimization level '{level}'"))?;
        } else if let Some(triple) = arg.strip_prefix("--target=") {
            options.target_triple = Some(triple.to_owned());
        } else if let Some(model) = arg.strip_prefix("--relocation-model=") {
            options.reloc = match model {
                "static" => RelocModel::Static,
                "pic" => RelocModel::PositionIndependent,
                other => return Err(format!("unknown relocation model '{other}'")),
            };
        } else if arg == "-o" {
            let dir = argv
                .next()
                .ok_or_else(|| "'-o' expects a directory".to_owned())?;
            options.output_dir = Some(PathBuf::from(dir));
        } else if arg == "--help" || arg == "-h" {
            print_usage();
            std::process::exit(0);
        } else if arg.starts_with('-') {
            return Err(format!("unknown option '{arg}'"));
        } else {
            inputs.push(PathBuf::from(arg));
        }
    }

    if inputs.is_empty() {
        return Err("no input files".to_owned());
    }
    Ok(Args {
        inputs,
        emit,
        options,
    })
}

fn print_usage() {
    eprintln!("Usage: lumenc [options] <file.lm>...");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --emit=obj|asm|ir|jit          what to produce (default: obj)");
    eprintln!("  -O<n>                          optimization level 0-3");
    eprintln!("  --target=<triple>              target triple override");
    eprintln!("  --relocation-model=static|pic  relocation model");
    eprintln!("  -o <dir>                       output directory");
}
