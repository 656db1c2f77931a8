/*!
The abstract syntax tree produced by the parser and annotated by the
semantic analyzer and the frame planner.

A Mica program is a single top-level procedure whose local definitions
may nest further functions to any depth.  Function definitions live in
an arena on [`Program`] and refer to each other through [`FuncId`]
indices: `LocalDef::Func`, `FuncDecl::def` and `FuncDef::parent` are all
indices, never owning pointers, so the parent/child and
declaration/definition back-references cannot form ownership cycles.

Annotation fields (`Header::label`, `FuncDef::parent`, `FuncDef::level`,
`LValue::lv_type`, `Call::info`, `FuncDef::frame`) start out `None` and
are each filled exactly once by the semantic phase or the frame planner;
the IR emitter treats them as read-only.
*/
pub mod ty;

pub use ty::{ArraySize, Type};

use super::memory::Frame;

/// Index of a function definition in the [`Program`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FuncId(pub u32);

#[derive(Debug)]
pub struct Program {
    pub funcs: Vec<FuncDef>,
    pub root: FuncId,
}

impl Program {
    pub fn func(&self, id: FuncId) -> &FuncDef {
        &self.funcs[id.0 as usize]
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut FuncDef {
        &mut self.funcs[id.0 as usize]
    }
}

#[derive(Debug)]
pub struct FuncDef {
    pub header: Header,
    pub local_defs: Vec<LocalDef>,
    pub body: Vec<Stmt>,

    /// The lexically enclosing function; `None` for the root procedure.
    pub parent: Option<FuncId>,
    /// Nesting depth: 0 for the root procedure, 1 for its locals, and so
    /// on.  Used by the call lowering to count access-link hops.
    pub level: Option<u32>,
    /// Stack-frame layout, installed by the frame planner.
    pub frame: Option<Frame>,
}

#[derive(Clone, Debug)]
pub struct Header {
    pub name: String,
    pub params: Vec<FparDef>,
    pub ret: Type,
    pub line: u32,

    /// Mangled identifier: the underscore-joined scope path from the
    /// global scope (`root_main_q`).  Doubles as the LLVM symbol name.
    pub label: Option<String>,
}

impl Header {
    /// Flattens the grouped parameter definitions into one entry per
    /// identifier, in source order.
    pub fn expand_params(&self) -> Vec<ParamSig> {
        let mut out = Vec::new();
        for fp in &self.params {
            for name in &fp.names {
                out.push(ParamSig {
                    name: name.clone(),
                    ty: fp.ty.clone(),
                    by_ref: fp.by_ref,
                });
            }
        }
        out
    }
}

/// One `a, b : ref int[10]` group from a header's parameter list.
#[derive(Clone, Debug)]
pub struct FparDef {
    pub names: Vec<String>,
    pub by_ref: bool,
    pub ty: Type,
    pub line: u32,
}

/// A single parameter after group expansion.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamSig {
    pub name: String,
    pub ty: Type,
    pub by_ref: bool,
}

#[derive(Debug)]
pub enum LocalDef {
    Var(VarDef),
    Decl(FuncDecl),
    Func(FuncId),
}

#[derive(Clone, Debug)]
pub struct VarDef {
    pub names: Vec<String>,
    pub ty: Type,
    pub line: u32,
}

/// A forward declaration (`header ;`).  The analyzer links it to the
/// matching definition later in the same local-definition list.
#[derive(Debug)]
pub struct FuncDecl {
    pub header: Header,
    pub line: u32,

    pub def: Option<FuncId>,
    pub is_redundant: bool,
}

#[derive(Debug)]
pub enum Stmt {
    Empty,
    Assign(LValue, Expr),
    Block(Vec<Stmt>),
    Call(Call),
    If {
        cond: Cond,
        then: Box<Stmt>,
        els: Option<Box<Stmt>>,
    },
    While(Cond, Box<Stmt>),
    Return(Option<Expr>, u32),
}

#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

#[derive(Debug)]
pub enum ExprKind {
    IntLit(i64),
    CharLit(u8),
    LValue(LValue),
    Call(Call),
    Signed(Sign, Box<Expr>),
    Binary(ArithOp, Box<Expr>, Box<Expr>),
    Paren(Box<Expr>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sign {
    Plus,
    Minus,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl std::fmt::Display for ArithOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArithOp::Add => f.write_str("+"),
            ArithOp::Sub => f.write_str("-"),
            ArithOp::Mul => f.write_str("*"),
            ArithOp::Div => f.write_str("/"),
            ArithOp::Mod => f.write_str("%"),
        }
    }
}

#[derive(Debug)]
pub struct Cond {
    pub kind: CondKind,
    pub line: u32,
}

#[derive(Debug)]
pub enum CondKind {
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    And(Box<Cond>, Box<Cond>),
    Or(Box<Cond>, Box<Cond>),
    Not(Box<Cond>),
    Paren(Box<Cond>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

#[derive(Debug)]
pub struct LValue {
    pub kind: LValueKind,
    pub line: u32,

    /// The type this lvalue denotes, filled by the analyzer.
    pub lv_type: Option<Type>,
}

impl LValue {
    /// Whether the lvalue ultimately addresses into a string literal.
    /// Elements of string literals are not assignable.
    pub fn rooted_in_string(&self) -> bool {
        match &self.kind {
            LValueKind::Id(_) => false,
            LValueKind::Str(_) => true,
            LValueKind::Index(sub, _) => sub.rooted_in_string(),
        }
    }

    /// The identifier at the root of the lvalue, if any.
    pub fn root_id(&self) -> Option<&str> {
        match &self.kind {
            LValueKind::Id(name) => Some(name),
            LValueKind::Str(_) => None,
            LValueKind::Index(sub, _) => sub.root_id(),
        }
    }
}

#[derive(Debug)]
pub enum LValueKind {
    Id(String),
    /// A string literal, stored as its unescaped bytes (no trailing NUL).
    Str(Vec<u8>),
    Index(Box<LValue>, Box<Expr>),
}

#[derive(Debug)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    pub line: u32,

    pub info: Option<CallInfo>,
}

/// Resolved callee facts recorded on every call node by the analyzer and
/// consumed verbatim by the IR emitter.
#[derive(Clone, Debug)]
pub struct CallInfo {
    /// Mangled callee symbol; the raw name for library functions.
    pub label: String,
    pub ret: Type,
    /// One `(type, by_ref)` pair per parameter, in order.
    pub params: Vec<(Type, bool)>,
    pub library: bool,
    /// The callee's nesting level; meaningless for library functions.
    pub level: u32,
}
