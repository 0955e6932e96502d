//! Per-invocation code generator: collects translation units
//! (chasing imports), lowers each into an LLVM module, and emits
//! object files, assembly, textual IR, or runs `main` under the JIT.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Once;

use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::passes::PassBuilderOptions;
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine, TargetTriple,
};
use inkwell::OptimizationLevel;
use lumen_ir::ast::{ItemKind, TranslationUnit};
use lumen_ir::{SourceMap, StringInterner};
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::context::{CodegenCx, UnitInfo};
use crate::error::CompileError;

/// Relocation model for emitted code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RelocModel {
    Static,
    PositionIndependent,
}

/// Driver-level configuration for one compiler invocation.
#[derive(Clone, Debug)]
pub struct CodegenOptions {
    /// 0 through 3.
    pub opt_level: u32,
    pub reloc: RelocModel,
    /// Target triple override; host triple when absent.
    pub target_triple: Option<String>,
    /// Directory for emitted artifacts; next to the sources when
    /// absent.
    pub output_dir: Option<PathBuf>,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            opt_level: 0,
            reloc: RelocModel::Static,
            target_triple: None,
            output_dir: None,
        }
    }
}

static INIT_TARGETS: Once = Once::new();

fn initialize_targets() {
    INIT_TARGETS.call_once(|| {
        Target::initialize_all(&InitializationConfig::default());
    });
}

fn optimization_level(level: u32) -> OptimizationLevel {
    match level {
        0 => OptimizationLevel::None,
        1 => OptimizationLevel::Less,
        2 => OptimizationLevel::Default,
        _ => OptimizationLevel::Aggressive,
    }
}

/// One source file parsed and ready to lower.
struct SourceUnit {
    unit: TranslationUnit,
    info: Rc<UnitInfo>,
}

/// Owns the compiled modules of an invocation, one per root source
/// file, paired with the path they came from.
pub struct CodeGenerator<'ctx> {
    llcx: &'ctx Context,
    interner: &'ctx StringInterner,
    options: CodegenOptions,
    target_machine: TargetMachine,
    modules: Vec<(Module<'ctx>, PathBuf)>,
}

impl<'ctx> CodeGenerator<'ctx> {
    pub fn new(
        llcx: &'ctx Context,
        interner: &'ctx StringInterner,
        options: CodegenOptions,
    ) -> Result<Self, CompileError> {
        if options.opt_level > 3 {
            return Err(CompileError::Backend(format!(
                "invalid optimization level {}",
                options.opt_level
            )));
        }

        initialize_targets();

        let triple = match &options.target_triple {
            Some(triple) => TargetTriple::create(triple),
            None => TargetMachine::get_default_triple(),
        };
        let target = Target::from_triple(&triple)
            .map_err(|err| CompileError::Backend(err.to_string()))?;
        let reloc = match options.reloc {
            RelocModel::Static => RelocMode::Static,
            RelocModel::PositionIndependent => RelocMode::PIC,
        };
        let target_machine = target
            .create_target_machine(
                &triple,
                "generic",
                "",
                optimization_level(options.opt_level),
                reloc,
                CodeModel::Default,
            )
            .ok_or_else(|| {
                CompileError::Backend(format!("no target machine for triple '{triple}'"))
            })?;

        Ok(CodeGenerator {
            llcx,
            interner,
            options,
            target_machine,
            modules: Vec::new(),
        })
    }

    /// Compile one root source file (plus its imports) into a module.
    pub fn compile_file(&mut self, path: &Path) -> Result<(), CompileError> {
        let source = std::fs::read_to_string(path)?;
        self.compile_source(path, &source)
    }

    /// Compile from in-memory source; imports still resolve relative
    /// to `path`'s directory.
    pub fn compile_source(&mut self, path: &Path, source: &str) -> Result<(), CompileError> {
        info!(file = %path.display(), "compiling");

        let mut seen = FxHashSet::default();
        let mut units = Vec::new();
        collect_units(path, Some(source), self.interner, &mut seen, &mut units)?;

        let module_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main".to_owned());

        let first_info = Rc::clone(&units[0].info);
        let ctx = CodegenCx::new(
            self.llcx,
            self.interner,
            &module_name,
            self.target_machine.get_target_data(),
            first_info,
        );
        ctx.llmod.set_triple(&self.target_machine.get_triple());
        ctx.llmod.set_data_layout(
            &self.target_machine.get_target_data().get_data_layout(),
        );

        // Imported units lower before the root, so everything a later
        // unit references is already registered.
        for source_unit in &units {
            ctx.swap_unit(Rc::clone(&source_unit.info));
            ctx.lower_unit(&source_unit.unit)?;
        }

        ctx.llmod
            .verify()
            .map_err(|err| CompileError::Backend(err.to_string()))?;

        if self.options.opt_level > 0 {
            let pipeline = format!("default<O{}>", self.options.opt_level);
            debug!(pipeline, "running optimization passes");
            ctx.llmod
                .run_passes(&pipeline, &self.target_machine, PassBuilderOptions::create())
                .map_err(|err| CompileError::Backend(err.to_string()))?;
        }

        self.modules.push((ctx.llmod, path.to_path_buf()));
        Ok(())
    }

    fn output_path(&self, source: &Path, extension: &str) -> PathBuf {
        let mut path = match &self.options.output_dir {
            Some(dir) => {
                let mut out = dir.clone();
                out.push(source.file_name().unwrap_or_default());
                out
            }
            None => source.to_path_buf(),
        };
        path.set_extension(extension);
        path
    }

    /// Emit the back end's canonical textual IR, one file per module.
    pub fn emit_ir_files(&self) -> Result<Vec<PathBuf>, CompileError> {
        let mut outputs = Vec::with_capacity(self.modules.len());
        for (module, source) in &self.modules {
            let out = self.output_path(source, "ll");
            module
                .print_to_file(&out)
                .map_err(|err| CompileError::Backend(err.to_string()))?;
            outputs.push(out);
        }
        Ok(outputs)
    }

    /// Emit native assembly, one file per module.
    pub fn emit_assembly_files(&self) -> Result<Vec<PathBuf>, CompileError> {
        self.emit_machine_files(FileType::Assembly, "s")
    }

    /// Emit native object files, one per module.
    pub fn emit_object_files(&self) -> Result<Vec<PathBuf>, CompileError> {
        self.emit_machine_files(FileType::Object, "o")
    }

    /// Emit object files at scratch paths the caller is expected to
    /// clean up (e.g. when handing them straight to a linker).
    pub fn emit_temporary_object_files(&self) -> Result<Vec<PathBuf>, CompileError> {
        let mut outputs = Vec::with_capacity(self.modules.len());
        for (module, source) in &self.modules {
            let stem = source
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "out".to_owned());
            let temp = tempfile::Builder::new()
                .prefix(&stem)
                .suffix(".o")
                .tempfile()?;
            let path = temp
                .into_temp_path()
                .keep()
                .map_err(|err| CompileError::Backend(err.to_string()))?;
            self.target_machine
                .write_to_file(module, FileType::Object, &path)
                .map_err(|err| CompileError::Backend(err.to_string()))?;
            outputs.push(path);
        }
        Ok(outputs)
    }

    fn emit_machine_files(
        &self,
        file_type: FileType,
        extension: &str,
    ) -> Result<Vec<PathBuf>, CompileError> {
        let mut outputs = Vec::with_capacity(self.modules.len());
        for (module, source) in &self.modules {
            let out = self.output_path(source, extension);
            self.target_machine
                .write_to_file(module, file_type, &out)
                .map_err(|err| CompileError::Backend(err.to_string()))?;
            outputs.push(out);
        }
        Ok(outputs)
    }

    /// Textual IR of every module, for tests and `--emit=ir` to stdout.
    pub fn ir_text(&self) -> Vec<String> {
        self.modules
            .iter()
            .map(|(module, _)| module.print_to_string().to_string())
            .collect()
    }

    /// Move the modules into a JIT execution engine and run `main`,
    /// returning its result. Consumes the generator: the modules are
    /// owned by the engine afterwards.
    pub fn run_jit(self) -> Result<i32, CompileError> {
        let mut modules = self.modules.into_iter();
        let (first, _) = modules
            .next()
            .ok_or_else(|| CompileError::Backend("nothing was compiled".to_owned()))?;

        let engine = first
            .create_jit_execution_engine(optimization_level(self.options.opt_level))
            .map_err(|err| CompileError::Backend(err.to_string()))?;
        for (module, _) in modules {
            engine
                .add_module(&module)
                .map_err(|()| CompileError::Backend("failed to add module to JIT".to_owned()))?;
        }

        // SAFETY: `main` was verified to exist with an i32 return; the
        // JIT owns the code for the lifetime of the call.
        unsafe {
            let main = engine
                .get_function::<unsafe extern "C" fn() -> i32>("main")
                .map_err(|err| {
                    CompileError::Backend(format!("symbol 'main' could not be found: {err}"))
                })?;
            Ok(main.call())
        }
    }
}

/// Read, lex, and parse a unit, then its imports depth-first, so the
/// output vector lists dependencies before dependents. Import cycles
/// are broken by the `seen` set.
fn collect_units(
    path: &Path,
    source_override: Option<&str>,
    interner: &StringInterner,
    seen: &mut FxHashSet<PathBuf>,
    units: &mut Vec<SourceUnit>,
) -> Result<(), CompileError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !seen.insert(canonical) {
        return Ok(());
    }

    let raw = match source_override {
        Some(source) => source.to_owned(),
        None => std::fs::read_to_string(path)?,
    };
    // Strip an optional byte-order mark.
    let source = raw.strip_prefix('\u{feff}').unwrap_or(&raw).to_owned();

    let tokens = lumen_lexer::lex(&source, interner);
    let result = lumen_parse::parse(&tokens, interner);
    let source_map = SourceMap::new(source);

    if !result.errors.is_empty() {
        let messages = result
            .errors
            .iter()
            .map(|err| {
                let pos = source_map.lookup(err.span);
                format!("{}:{}:{}: {}", path.display(), pos.line, pos.column, err)
            })
            .collect::<Vec<_>>();
        return Err(CompileError::Parse {
            file: path.to_path_buf(),
            count: messages.len(),
            messages,
        });
    }

    // Imports resolve relative to the importing file.
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut imports = Vec::new();
    for item in &result.unit.items {
        if let ItemKind::Import { path: import } = &item.kind {
            let mut target = parent.join(interner.lookup(*import));
            if target.extension().is_none() {
                target.set_extension("lm");
            }
            imports.push(target);
        }
    }
    for import in imports {
        collect_units(&import, None, interner, seen, units)?;
    }

    units.push(SourceUnit {
        unit: result.unit,
        info: Rc::new(UnitInfo {
            arena: result.arena,
            source_map,
            file: path.to_path_buf(),
        }),
    });
    Ok(())
}
