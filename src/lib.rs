pub mod result;

pub mod cli;
pub mod compiler;

pub use cli::*;
pub use compiler::{llvm, semantics::analyzer::analyze, Lexer};
