use log::debug;

use crate::compiler::ast::*;
use crate::compiler::library::library_functions;

use super::const_eval::{const_cond_value, const_expr_value};
use super::symbol_table::{DefState, EntryId, EntryKind, Passing, SymbolTable};
use super::{SemanticError, SemanticErrorKind};

type SemanticResult<T> = Result<T, SemanticError>;

/// Analyzes the whole program, mutating only annotation fields:
/// `parent`/`level`/`label` on function definitions, `lv_type` on
/// lvalues, `info` on calls, and the forward-declaration back-links.
/// Running it a second time recomputes the same annotations.
pub fn analyze(prog: &mut Program) -> SemanticResult<()> {
    let mut analyzer = Analyzer::new();
    let root = prog.root;
    analyzer.analyze_func(prog, root)
}

pub struct Analyzer {
    symbols: SymbolTable,
    /// The functions currently being analyzed, outermost first, with a
    /// `None` sentinel below the root so the root sees no parent.
    ancestors: Vec<Option<FuncId>>,
}

impl Analyzer {
    pub fn new() -> Analyzer {
        let mut symbols = SymbolTable::new();
        for lib in library_functions() {
            symbols.enter_function(lib.name, lib.params, lib.ret, DefState::Defined, true);
        }
        Analyzer {
            symbols,
            ancestors: vec![None],
        }
    }

    fn warn(&self, line: u32, msg: &str) {
        eprintln!("Warning: L{}: {}", line, msg);
    }

    fn analyze_func(&mut self, prog: &mut Program, f: FuncId) -> SemanticResult<()> {
        let parent = *self.ancestors.last().unwrap();
        let level = (self.ancestors.len() - 1) as u32;
        {
            let fd = prog.func_mut(f);
            fd.parent = parent;
            fd.level = Some(level);
        }

        let header = prog.func(f).header.clone();
        debug!("Analyzing function {} at level {}", header.name, level);
        let entry = self.process_header(&header, true)?;
        prog.func_mut(f).header.label = Some(self.symbols.label_of(entry));

        self.symbols.open_scope(&header.name);
        for p in header.expand_params() {
            if self.symbols.lookup_current(&p.name).is_some() {
                return Err(SemanticError::new(
                    header.line,
                    SemanticErrorKind::DuplicateParameter(p.name, header.name.clone()),
                ));
            }
            p.ty.check_dims(&p.name, header.line)?;
            // Arrays travel by reference even without the `ref` keyword.
            let passing = if p.by_ref || p.ty.is_array() {
                Passing::ByReference
            } else {
                Passing::ByValue
            };
            self.symbols.enter_parameter(&p.name, p.ty, passing);
        }

        self.ancestors.push(Some(f));
        let num_defs = prog.func(f).local_defs.len();
        for i in 0..num_defs {
            match &prog.func(f).local_defs[i] {
                LocalDef::Var(_) => self.local_var(prog, f, i)?,
                LocalDef::Decl(_) => self.forward_decl(prog, f, i)?,
                LocalDef::Func(id) => {
                    let id = *id;
                    self.analyze_func(prog, id)?;
                }
            }
        }
        self.ancestors.pop();

        if level == 0 {
            // No forward declaration may survive to the end of the
            // program without a definition.
            if let Some(name) = self.symbols.undefined_functions().first() {
                return Err(SemanticError::new(
                    header.line,
                    SemanticErrorKind::DeclaredNotDefined(name.clone()),
                ));
            }
        }

        for stmt in prog.func_mut(f).body.iter_mut() {
            self.sem_stmt(stmt)?;
        }

        let produced = self
            .block_return_type(&prog.func(f).body)?
            .unwrap_or(Type::Proc);
        if produced != header.ret {
            return Err(SemanticError::new(
                header.line,
                SemanticErrorKind::BodyReturnMismatch(
                    header.name.clone(),
                    header.ret.clone(),
                    produced,
                ),
            ));
        }

        self.symbols.close_scope();
        Ok(())
    }

    /// Enters or matches a function header in the current scope.  A
    /// header matches an existing entry only when parameter count,
    /// parameter types, passing modes and return type all agree; a
    /// definition additionally flips the entry's state to `Defined`.
    fn process_header(&mut self, header: &Header, is_definition: bool) -> SemanticResult<EntryId> {
        let line = header.line;
        if self.symbols.depth() == 0 {
            if header.ret != Type::Proc {
                return Err(SemanticError::new(
                    line,
                    SemanticErrorKind::MainBadReturnType(header.ret.clone()),
                ));
            }
            if !header.params.is_empty() {
                return Err(SemanticError::new(line, SemanticErrorKind::MainHasParameters));
            }
        }

        // Arrays travel by reference whether or not `ref` was written,
        // so normalize the flag before storing or comparing signatures.
        let sig: Vec<ParamSig> = header
            .expand_params()
            .into_iter()
            .map(|p| ParamSig {
                by_ref: p.by_ref || p.ty.is_array(),
                ..p
            })
            .collect();
        for p in &sig {
            p.ty.check_dims(&p.name, line)?;
        }

        match self.symbols.lookup_current(&header.name) {
            Some(id) => {
                let (eparams, eret, estate) = match &self.symbols.entry(id).kind {
                    EntryKind::Function {
                        params, ret, state, ..
                    } => (params.clone(), ret.clone(), *state),
                    _ => {
                        return Err(SemanticError::new(
                            line,
                            SemanticErrorKind::FunctionNameTaken(header.name.clone()),
                        ))
                    }
                };
                if eparams.len() != sig.len() {
                    return Err(SemanticError::new(
                        line,
                        SemanticErrorKind::Overloaded(header.name.clone()),
                    ));
                }
                if eret != header.ret {
                    return Err(SemanticError::new(
                        line,
                        SemanticErrorKind::DeclReturnMismatch(
                            header.name.clone(),
                            eret,
                            header.ret.clone(),
                        ),
                    ));
                }
                for (ep, hp) in eparams.iter().zip(sig.iter()) {
                    if !ep.ty.matches(&hp.ty) || ep.by_ref != hp.by_ref {
                        return Err(SemanticError::new(
                            line,
                            SemanticErrorKind::DeclParameterMismatch(
                                header.name.clone(),
                                hp.name.clone(),
                            ),
                        ));
                    }
                }
                if is_definition {
                    if estate == DefState::Defined {
                        return Err(SemanticError::new(
                            line,
                            SemanticErrorKind::Redefinition(header.name.clone()),
                        ));
                    }
                    self.symbols.set_func_defined(id);
                }
                Ok(id)
            }
            None => {
                let state = if is_definition {
                    DefState::Defined
                } else {
                    DefState::Declared
                };
                Ok(self
                    .symbols
                    .enter_function(&header.name, sig, header.ret.clone(), state, false))
            }
        }
    }

    fn local_var(&mut self, prog: &mut Program, f: FuncId, i: usize) -> SemanticResult<()> {
        let var = match &prog.func(f).local_defs[i] {
            LocalDef::Var(v) => v.clone(),
            _ => unreachable!(),
        };
        for name in &var.names {
            if let Some(existing) = self.symbols.lookup_current(name) {
                let kind = match self.symbols.entry(existing).kind {
                    EntryKind::Parameter { .. } => {
                        SemanticErrorKind::VariableParameterCollision(name.clone())
                    }
                    EntryKind::Variable { .. } => SemanticErrorKind::DuplicateVariable(name.clone()),
                    EntryKind::Function { .. } => {
                        SemanticErrorKind::VariableFunctionCollision(name.clone())
                    }
                };
                return Err(SemanticError::new(var.line, kind));
            }
            var.ty.check_dims(name, var.line)?;
            self.symbols.enter_variable(name, var.ty.clone());
        }
        Ok(())
    }

    /// The forward-declaration protocol: the first declaration of `g`
    /// must be followed by a definition of `g` in the same
    /// local-definition list and is linked to it; any further
    /// declaration of `g` is redundant and only warned about.
    fn forward_decl(&mut self, prog: &mut Program, f: FuncId, i: usize) -> SemanticResult<()> {
        let (decl_header, decl_line) = match &prog.func(f).local_defs[i] {
            LocalDef::Decl(d) => (d.header.clone(), d.line),
            _ => unreachable!(),
        };
        let already_known = self.symbols.lookup_current(&decl_header.name).is_some();
        self.process_header(&decl_header, false)?;

        if already_known {
            self.warn(
                decl_line,
                &format!("Redundant forward declaration of {}", decl_header.name),
            );
            if let LocalDef::Decl(d) = &mut prog.func_mut(f).local_defs[i] {
                d.is_redundant = true;
            }
            return Ok(());
        }

        let mut found = None;
        for def in &prog.func(f).local_defs[i + 1..] {
            if let LocalDef::Func(id) = def {
                if prog.func(*id).header.name == decl_header.name {
                    found = Some(*id);
                    break;
                }
            }
        }
        match found {
            Some(id) => {
                if let LocalDef::Decl(d) = &mut prog.func_mut(f).local_defs[i] {
                    d.def = Some(id);
                }
                Ok(())
            }
            None => Err(SemanticError::new(
                decl_line,
                SemanticErrorKind::DeclaredNotDefined(decl_header.name),
            )),
        }
    }

    fn sem_stmt(&mut self, stmt: &mut Stmt) -> SemanticResult<()> {
        match stmt {
            Stmt::Empty => Ok(()),
            Stmt::Assign(lv, e) => {
                let lt = self.sem_lvalue(lv)?;
                if lv.rooted_in_string() {
                    return Err(SemanticError::new(
                        lv.line,
                        SemanticErrorKind::AssignToStringLiteral,
                    ));
                }
                match &lt {
                    Type::Array(..) => {
                        return Err(SemanticError::new(
                            lv.line,
                            SemanticErrorKind::AssignToArray(lt),
                        ))
                    }
                    Type::Func(_) => {
                        return Err(SemanticError::new(
                            lv.line,
                            SemanticErrorKind::AssignToFunction(
                                lv.root_id().unwrap_or_default().into(),
                            ),
                        ))
                    }
                    _ => (),
                }
                let rt = self.sem_expr(e)?;
                if rt != lt {
                    return Err(SemanticError::new(
                        e.line,
                        SemanticErrorKind::AssignMismatch(lt, rt),
                    ));
                }
                Ok(())
            }
            Stmt::Call(call) => {
                let ret = self.sem_call(call)?;
                if ret != Type::Proc {
                    self.warn(
                        call.line,
                        &format!("The return value of {} is ignored", call.name),
                    );
                }
                Ok(())
            }
            Stmt::Block(stmts) => {
                for s in stmts.iter_mut() {
                    self.sem_stmt(s)?;
                }
                Ok(())
            }
            Stmt::If { cond, then, els } => {
                self.sem_cond(cond)?;
                self.sem_stmt(then)?;
                if let Some(els) = els {
                    self.sem_stmt(els)?;
                }
                Ok(())
            }
            Stmt::While(cond, body) => {
                self.sem_cond(cond)?;
                self.sem_stmt(body)
            }
            Stmt::Return(e, _) => {
                if let Some(e) = e {
                    self.sem_expr(e)?;
                }
                Ok(())
            }
        }
    }

    fn sem_lvalue(&mut self, lv: &mut LValue) -> SemanticResult<Type> {
        let line = lv.line;
        let ty = match &mut lv.kind {
            LValueKind::Id(name) => {
                let id = self.symbols.lookup(name).ok_or_else(|| {
                    SemanticError::new(line, SemanticErrorKind::Undefined(name.clone()))
                })?;
                match &self.symbols.entry(id).kind {
                    EntryKind::Variable { ty } => ty.clone(),
                    EntryKind::Parameter { ty, .. } => ty.clone(),
                    EntryKind::Function { ret, .. } => Type::Func(Box::new(ret.clone())),
                }
            }
            LValueKind::Str(bytes) => {
                // Typed with room for the trailing NUL the emitter adds.
                Type::array(Type::Char, ArraySize::Fixed(bytes.len() as u32 + 1))
            }
            LValueKind::Index(sub, index) => {
                let it = self.sem_expr(index)?;
                if it != Type::Int {
                    return Err(SemanticError::new(
                        index.line,
                        SemanticErrorKind::IndexNotInt(it),
                    ));
                }
                match self.sem_lvalue(sub)? {
                    Type::Array(elem, size) => {
                        if let ArraySize::Fixed(n) = size {
                            if let Some(v) = const_expr_value(index) {
                                if v < 0 || v >= n as i64 {
                                    return Err(SemanticError::new(
                                        index.line,
                                        SemanticErrorKind::IndexOutOfBounds(v, n),
                                    ));
                                }
                            }
                        }
                        *elem
                    }
                    other => {
                        return Err(SemanticError::new(
                            line,
                            SemanticErrorKind::IndexNonArray(other),
                        ))
                    }
                }
            }
        };
        lv.lv_type = Some(ty.clone());
        Ok(ty)
    }

    fn sem_expr(&mut self, e: &mut Expr) -> SemanticResult<Type> {
        let line = e.line;
        match &mut e.kind {
            ExprKind::IntLit(_) => Ok(Type::Int),
            ExprKind::CharLit(_) => Ok(Type::Char),
            ExprKind::LValue(lv) => {
                let ty = self.sem_lvalue(lv)?;
                if let Type::Func(_) = ty {
                    return Err(SemanticError::new(
                        line,
                        SemanticErrorKind::NotAVariable(lv.root_id().unwrap_or_default().into()),
                    ));
                }
                Ok(ty)
            }
            ExprKind::Call(call) => self.sem_call(call),
            ExprKind::Signed(_, inner) => {
                let ty = self.sem_expr(inner)?;
                if ty != Type::Int {
                    return Err(SemanticError::new(
                        line,
                        SemanticErrorKind::SignOperandNotInt(ty),
                    ));
                }
                Ok(Type::Int)
            }
            ExprKind::Binary(_, l, r) => {
                let lt = self.sem_expr(l)?;
                if lt != Type::Int {
                    return Err(SemanticError::new(
                        l.line,
                        SemanticErrorKind::ArithOperandNotInt(lt),
                    ));
                }
                let rt = self.sem_expr(r)?;
                if rt != Type::Int {
                    return Err(SemanticError::new(
                        r.line,
                        SemanticErrorKind::ArithOperandNotInt(rt),
                    ));
                }
                Ok(Type::Int)
            }
            ExprKind::Paren(inner) => self.sem_expr(inner),
        }
    }

    fn sem_cond(&mut self, cond: &mut Cond) -> SemanticResult<()> {
        let line = cond.line;
        match &mut cond.kind {
            CondKind::Compare(_, l, r) => {
                let lt = self.sem_expr(l)?;
                let rt = self.sem_expr(r)?;
                if !lt.is_scalar() || lt != rt {
                    return Err(SemanticError::new(
                        line,
                        SemanticErrorKind::CompareMismatch(lt, rt),
                    ));
                }
                Ok(())
            }
            CondKind::And(l, r) | CondKind::Or(l, r) => {
                self.sem_cond(l)?;
                self.sem_cond(r)
            }
            CondKind::Not(inner) | CondKind::Paren(inner) => self.sem_cond(inner),
        }
    }

    fn sem_call(&mut self, call: &mut Call) -> SemanticResult<Type> {
        let line = call.line;
        let id = self.symbols.lookup(&call.name).ok_or_else(|| {
            SemanticError::new(line, SemanticErrorKind::Undefined(call.name.clone()))
        })?;
        let (params, ret, library) = match &self.symbols.entry(id).kind {
            EntryKind::Function {
                params,
                ret,
                library,
                ..
            } => (params.clone(), ret.clone(), *library),
            _ => {
                return Err(SemanticError::new(
                    line,
                    SemanticErrorKind::NotAFunction(call.name.clone()),
                ))
            }
        };

        if call.args.len() != params.len() {
            return Err(SemanticError::new(
                line,
                SemanticErrorKind::WrongArgCount(call.name.clone(), params.len(), call.args.len()),
            ));
        }
        for (i, (arg, param)) in call.args.iter_mut().zip(params.iter()).enumerate() {
            let at = self.sem_expr(arg)?;
            if !at.matches(&param.ty) {
                return Err(SemanticError::new(
                    arg.line,
                    SemanticErrorKind::ArgTypeMismatch(
                        call.name.clone(),
                        i,
                        param.ty.clone(),
                        at,
                    ),
                ));
            }
            if param.by_ref && !is_lvalue_expr(arg) {
                return Err(SemanticError::new(
                    arg.line,
                    SemanticErrorKind::RefArgNotLValue(call.name.clone(), i),
                ));
            }
        }

        call.info = Some(CallInfo {
            label: self.symbols.label_of(id),
            ret: ret.clone(),
            params: params.into_iter().map(|p| (p.ty, p.by_ref)).collect(),
            library,
            level: self.symbols.depth_of(id),
        });
        Ok(ret)
    }

    /// The return-producing type of a statement sequence: the type of
    /// the first definitely-returning statement.  Anything after that
    /// statement is unreachable and reported once.
    fn block_return_type(&mut self, stmts: &[Stmt]) -> SemanticResult<Option<Type>> {
        let mut produced = None;
        for stmt in stmts {
            if produced.is_some() {
                self.warn(
                    stmt_line(stmt),
                    "Unreachable code after a returning statement",
                );
                break;
            }
            produced = self.stmt_return_type(stmt)?;
        }
        Ok(produced)
    }

    fn stmt_return_type(&mut self, stmt: &Stmt) -> SemanticResult<Option<Type>> {
        match stmt {
            Stmt::Return(None, _) => Ok(Some(Type::Proc)),
            Stmt::Return(Some(e), _) => Ok(Some(expr_type(e))),
            Stmt::Block(stmts) => self.block_return_type(stmts),
            Stmt::If {
                cond,
                then,
                els: Some(els),
            } => {
                let tt = self.stmt_return_type(then)?;
                let et = self.stmt_return_type(els)?;
                match (tt, et) {
                    (Some(t), Some(e)) if t == e => Ok(Some(t)),
                    (Some(t), Some(e)) => Err(SemanticError::new(
                        cond.line,
                        SemanticErrorKind::IfArmMismatch(t, e),
                    )),
                    _ => Ok(None),
                }
            }
            Stmt::If {
                cond,
                then,
                els: None,
            } => {
                let tt = self.stmt_return_type(then)?;
                if const_cond_value(cond) == Some(true) {
                    Ok(tt)
                } else {
                    Ok(None)
                }
            }
            Stmt::While(cond, body) => {
                let bt = self.stmt_return_type(body)?;
                if const_cond_value(cond) == Some(true) {
                    if bt.is_none() {
                        self.warn(
                            cond.line,
                            "Infinite loop: the condition is always true and the body never returns",
                        );
                    }
                    Ok(bt)
                } else {
                    Ok(None)
                }
            }
            Stmt::Empty | Stmt::Assign(..) | Stmt::Call(_) => Ok(None),
        }
    }
}

/// The type of an already-analyzed expression, read back from the
/// annotations; panics on an unannotated tree.
pub fn expr_type(e: &Expr) -> Type {
    match &e.kind {
        ExprKind::IntLit(_) => Type::Int,
        ExprKind::CharLit(_) => Type::Char,
        ExprKind::LValue(lv) => lv
            .lv_type
            .clone()
            .expect("lvalue was not annotated by semantic analysis"),
        ExprKind::Call(call) => {
            call.info
                .as_ref()
                .expect("call was not annotated by semantic analysis")
                .ret
                .clone()
        }
        ExprKind::Signed(..) | ExprKind::Binary(..) => Type::Int,
        ExprKind::Paren(inner) => expr_type(inner),
    }
}

/// Whether an expression is an lvalue, looking through parentheses.
/// By-reference arguments must satisfy this.
fn is_lvalue_expr(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::LValue(_) => true,
        ExprKind::Paren(inner) => is_lvalue_expr(inner),
        _ => false,
    }
}

/// Whether a statement definitely returns on all paths.  The IR emitter
/// uses this to stop lowering dead siblings; it mirrors the reachability
/// rules of `block_return_type` without needing the symbol table.
pub fn stmt_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(..) => true,
        Stmt::Block(stmts) => block_returns(stmts),
        Stmt::If {
            then,
            els: Some(els),
            ..
        } => stmt_returns(then) && stmt_returns(els),
        Stmt::If {
            cond,
            then,
            els: None,
        } => const_cond_value(cond) == Some(true) && stmt_returns(then),
        Stmt::While(cond, body) => const_cond_value(cond) == Some(true) && stmt_returns(body),
        Stmt::Empty | Stmt::Assign(..) | Stmt::Call(_) => false,
    }
}

pub fn block_returns(stmts: &[Stmt]) -> bool {
    stmts.iter().any(stmt_returns)
}

fn stmt_line(stmt: &Stmt) -> u32 {
    match stmt {
        Stmt::Empty => 0,
        Stmt::Assign(lv, _) => lv.line,
        Stmt::Block(stmts) => stmts.first().map(stmt_line).unwrap_or(0),
        Stmt::Call(call) => call.line,
        Stmt::If { cond, .. } => cond.line,
        Stmt::While(cond, _) => cond.line,
        Stmt::Return(_, line) => *line,
    }
}
