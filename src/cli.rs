use clap::{App, Arg, ArgMatches};

// Exit codes for the different phases that can fail.
pub const ERR_LEXER_ERROR: i32 = 1;
pub const ERR_PARSER_ERROR: i32 = 2;
pub const ERR_SEMANTIC_ERROR: i32 = 3;
pub const ERR_LLVM_IR_ERROR: i32 = 4;
pub const ERR_IO_ERROR: i32 = 5;
pub const ERR_LINK_ERROR: i32 = 6;

pub fn print_errs(errs: &[String]) {
    for e in errs {
        eprintln!("{}", e);
    }
}

pub fn configure_cli() -> clap::App<'static, 'static> {
    let app = App::new("Mica Compiler")
        .version("0.1.0")
        .about("Compiles Mica language files into LLVM IR and native executables")
        .arg(
            Arg::with_name("input")
                .index(1)
                .required_unless_one(&["stdin-asm", "stdin-ir"])
                .help("Source code file to compile"),
        )
        .arg(
            Arg::with_name("optimize")
                .short("O")
                .help("Run the back-end optimization passes over the generated IR"),
        )
        .arg(
            Arg::with_name("stdin-asm")
                .short("f")
                .conflicts_with("stdin-ir")
                .help("Read the program from standard input and write assembly to standard output"),
        )
        .arg(
            Arg::with_name("stdin-ir")
                .short("i")
                .help("Read the program from standard input and write LLVM IR to standard output"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Increase logging verbosity (-v for debug, -vv for trace)"),
        );
    app
}

pub fn get_log_level(args: &ArgMatches) -> log::LevelFilter {
    match args.occurrences_of("verbose") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}
