extern crate log;
extern crate simplelog;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use inkwell::context::Context;
use simplelog::{Config, SimpleLogger};

use mica_lang::compiler::memory::plan_frames;
use mica_lang::compiler::parser::Parser;
use mica_lang::compiler::semantics::analyzer::analyze;
use mica_lang::compiler::Lexer;
use mica_lang::llvm::IrGen;
use mica_lang::*;

/// Name of the runtime library the executable links against; its
/// directory comes from MICA_RUNTIME (default: the source's directory).
const RUNTIME_LIB: &str = "micart";

fn main() -> Result<(), i32> {
    let config = configure_cli().get_matches();
    SimpleLogger::init(get_log_level(&config), Config::default())
        .expect("Failed to configure logger");

    let to_stdout_ir = config.is_present("stdin-ir");
    let to_stdout_asm = config.is_present("stdin-asm");
    let from_stdin = to_stdout_ir || to_stdout_asm;

    let (source, src_path) = if from_stdin {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).map_err(|e| {
            print_errs(&[format!("Could not read standard input: {}", e)]);
            ERR_IO_ERROR
        })?;
        (text, None)
    } else {
        let input = config
            .value_of("input")
            .expect("Expected an input source file to compile");
        let path = PathBuf::from(input);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            print_errs(&[format!("Could not open {}: {}", input, e)]);
            ERR_IO_ERROR
        })?;
        (text, Some(path))
    };

    let tokens = Lexer::new(&source).tokenize().map_err(|e| {
        print_errs(&[format!("Lexical error: {}", e)]);
        ERR_LEXER_ERROR
    })?;

    let mut prog = Parser::parse(&tokens).map_err(|e| {
        print_errs(&[format!("Syntax error: {}", e)]);
        ERR_PARSER_ERROR
    })?;
    println!("Successful parsing");

    analyze(&mut prog).map_err(|e| {
        print_errs(&[format!("Semantic error: {}", e)]);
        ERR_SEMANTIC_ERROR
    })?;
    println!("Semantically correct");

    plan_frames(&mut prog);

    let module_name = src_path
        .as_ref()
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mica".into());
    let context = Context::create();
    let mut llvm = IrGen::new(&context, &module_name);
    llvm.ingest(&prog);
    llvm.verify().map_err(|e| {
        print_errs(&[format!("Internal error: generated invalid IR: {}", e)]);
        ERR_LLVM_IR_ERROR
    })?;

    if config.is_present("optimize") {
        llvm.optimize();
    }

    if to_stdout_ir {
        print!("{}", llvm.llvm_ir_string());
        return Ok(());
    }
    if to_stdout_asm {
        let asm = llvm.assembly_string().map_err(|e| {
            print_errs(&[e]);
            ERR_LLVM_IR_ERROR
        })?;
        print!("{}", asm);
        return Ok(());
    }

    // Default mode: <stem>.imm and <stem>.asm next to the source, then
    // an a.out linked against the runtime library.
    let src_path = src_path.expect("file mode requires a source path");
    let imm_path = src_path.with_extension("imm");
    let asm_path = src_path.with_extension("asm");
    let obj_path = src_path.with_extension("o");

    llvm.emit_llvm_ir(&imm_path).map_err(|e| {
        print_errs(&[e]);
        ERR_IO_ERROR
    })?;
    llvm.emit_assembly(&asm_path).map_err(|e| {
        print_errs(&[e]);
        ERR_IO_ERROR
    })?;
    llvm.emit_object_code(&obj_path).map_err(|e| {
        print_errs(&[e]);
        ERR_IO_ERROR
    })?;

    link(&obj_path, &src_path).map_err(|e| {
        print_errs(&[e]);
        ERR_LINK_ERROR
    })?;

    Ok(())
}

/// Link the object file into ./a.out with the system C driver, pulling
/// in the Mica runtime library.
fn link(obj_path: &Path, src_path: &Path) -> result::Result<()> {
    let runtime_dir = std::env::var("MICA_RUNTIME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            src_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });

    let status = Command::new("cc")
        .arg(obj_path)
        .arg("-o")
        .arg("a.out")
        .arg("-L")
        .arg(&runtime_dir)
        .arg(format!("-l{}", RUNTIME_LIB))
        .status()
        .map_err(|e| format!("Could not run the system linker: {}", e))?;

    if status.success() {
        Ok(())
    } else {
        Err(format!("Linking failed with {}", status))
    }
}
