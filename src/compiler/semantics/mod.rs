/*
 * Semantic analysis of a parsed Mica program:
 * 1. Name resolution across the nested lexical scopes, including the
 *    forward-declaration protocol for mutually recursive functions.
 * 2. Type checking of every expression, condition and statement.
 * 3. Reachability analysis of statement blocks and the check that every
 *    function's body produces its declared return type.
 * 4. Annotation of the tree (lvalue types, call signatures, mangled
 *    labels, parent links) for the frame planner and the IR emitter.
 */
mod tests;

pub mod analyzer;
pub mod const_eval;
pub mod error;
pub mod symbol_table;

pub use analyzer::{analyze, block_returns, stmt_returns};
pub use error::{SemanticError, SemanticErrorKind};
