use std::collections::HashMap;

use crate::compiler::ast::*;

/// Stores the string literals that occur within a Mica compilation
/// unit.  Each distinct literal becomes one module global with a
/// trailing NUL, emitted once no matter how often it appears.
#[derive(Debug)]
pub struct StringPool {
    pub pool: HashMap<Vec<u8>, usize>,
}

impl StringPool {
    pub fn new() -> StringPool {
        StringPool {
            pool: HashMap::new(),
        }
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, Vec<u8>, usize> {
        self.pool.iter()
    }

    /// If the given string is not in the pool, insert it and assign it
    /// the next unique ID.
    pub fn insert(&mut self, s: &[u8]) {
        if self.pool.contains_key(s) {
            return;
        }
        let id = self.pool.len();
        self.pool.insert(s.to_vec(), id);
    }

    /// Returns the unique ID for a string already in the pool.
    pub fn get(&self, s: &[u8]) -> Option<&usize> {
        self.pool.get(s)
    }

    /// Name of the module global bound to the string with this ID.
    pub fn global_name(id: usize) -> String {
        format!("str_{}", id)
    }

    /// Walk every function body and collect the string literals.
    pub fn extract_from_program(&mut self, prog: &Program) {
        for func in &prog.funcs {
            for stmt in &func.body {
                self.extract_from_stmt(stmt);
            }
        }
    }

    fn extract_from_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Empty => (),
            Stmt::Assign(lv, e) => {
                self.extract_from_lvalue(lv);
                self.extract_from_expr(e);
            }
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.extract_from_stmt(s);
                }
            }
            Stmt::Call(call) => self.extract_from_call(call),
            Stmt::If { cond, then, els } => {
                self.extract_from_cond(cond);
                self.extract_from_stmt(then);
                if let Some(els) = els {
                    self.extract_from_stmt(els);
                }
            }
            Stmt::While(cond, body) => {
                self.extract_from_cond(cond);
                self.extract_from_stmt(body);
            }
            Stmt::Return(e, _) => {
                if let Some(e) = e {
                    self.extract_from_expr(e);
                }
            }
        }
    }

    fn extract_from_expr(&mut self, e: &Expr) {
        match &e.kind {
            ExprKind::IntLit(_) | ExprKind::CharLit(_) => (),
            ExprKind::LValue(lv) => self.extract_from_lvalue(lv),
            ExprKind::Call(call) => self.extract_from_call(call),
            ExprKind::Signed(_, inner) | ExprKind::Paren(inner) => self.extract_from_expr(inner),
            ExprKind::Binary(_, l, r) => {
                self.extract_from_expr(l);
                self.extract_from_expr(r);
            }
        }
    }

    fn extract_from_cond(&mut self, cond: &Cond) {
        match &cond.kind {
            CondKind::Compare(_, l, r) => {
                self.extract_from_expr(l);
                self.extract_from_expr(r);
            }
            CondKind::And(l, r) | CondKind::Or(l, r) => {
                self.extract_from_cond(l);
                self.extract_from_cond(r);
            }
            CondKind::Not(inner) | CondKind::Paren(inner) => self.extract_from_cond(inner),
        }
    }

    fn extract_from_lvalue(&mut self, lv: &LValue) {
        match &lv.kind {
            LValueKind::Id(_) => (),
            LValueKind::Str(bytes) => self.insert(bytes),
            LValueKind::Index(sub, index) => {
                self.extract_from_lvalue(sub);
                self.extract_from_expr(index);
            }
        }
    }

    fn extract_from_call(&mut self, call: &Call) {
        for arg in &call.args {
            self.extract_from_expr(arg);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compiler::parser::Parser;
    use crate::compiler::Lexer;

    #[test]
    fn insert_string() {
        let mut sp = StringPool::new();
        sp.insert(b"hello, world");

        assert!(sp.get(b"hello, world").is_some());
        assert!(sp.get(b"not there").is_none());
    }

    #[test]
    fn insert_duplicate() {
        let mut sp = StringPool::new();
        sp.insert(b"test");
        let first_id = *sp.get(b"test").unwrap();
        sp.insert(b"test");
        let second_id = *sp.get(b"test").unwrap();

        assert_eq!(first_id, second_id);
    }

    #[test]
    fn extract_from_ast() {
        for (text, expected) in vec![
            (
                "main () : proc { writeString(\"hi\"); }",
                vec![b"hi".to_vec()],
            ),
            (
                "main () : proc
                   var c : char;
                 {
                   writeString(\"one\");
                   if (\"two\"[0] = 'a') c := \"three\"[1];
                 }",
                vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()],
            ),
            (
                "main () : proc
                   f () : proc { writeString(\"nested\"); }
                 { f(); }",
                vec![b"nested".to_vec()],
            ),
        ] {
            let tokens = Lexer::new(text).tokenize().unwrap();
            let prog = Parser::parse(&tokens).unwrap();
            let mut sp = StringPool::new();
            sp.extract_from_program(&prog);

            assert_eq!(sp.pool.len(), expected.len(), "{}", text);
            for s in &expected {
                assert!(sp.get(s).is_some(), "{} missing from pool", text);
            }
        }
    }
}
