use crate::compiler::ast::{ArithOp, CmpOp, Cond, CondKind, Expr, ExprKind, Sign};

/// Folds an expression to its compile-time integer value, when it has
/// one.  Anything involving identifiers or calls is not constant, and a
/// division or remainder by zero makes the whole expression non-constant
/// (the runtime behavior is left to the runtime).
pub fn const_expr_value(e: &Expr) -> Option<i64> {
    match &e.kind {
        ExprKind::IntLit(v) => Some(*v),
        ExprKind::CharLit(_) => None,
        ExprKind::LValue(_) | ExprKind::Call(_) => None,
        ExprKind::Signed(Sign::Plus, inner) => const_expr_value(inner),
        ExprKind::Signed(Sign::Minus, inner) => const_expr_value(inner).map(|v| -v),
        ExprKind::Binary(op, l, r) => {
            let l = const_expr_value(l)?;
            let r = const_expr_value(r)?;
            match op {
                ArithOp::Add => l.checked_add(r),
                ArithOp::Sub => l.checked_sub(r),
                ArithOp::Mul => l.checked_mul(r),
                ArithOp::Div => l.checked_div(r),
                ArithOp::Mod => l.checked_rem(r),
            }
        }
        ExprKind::Paren(inner) => const_expr_value(inner),
    }
}

/// Folds a condition to its compile-time truth value, when it has one.
/// `and`/`or` fold even with one unknown side when the known side alone
/// decides the outcome, matching their runtime short-circuiting.
pub fn const_cond_value(c: &Cond) -> Option<bool> {
    match &c.kind {
        CondKind::Compare(op, l, r) => {
            let l = const_expr_value(l)?;
            let r = const_expr_value(r)?;
            Some(match op {
                CmpOp::Eq => l == r,
                CmpOp::Neq => l != r,
                CmpOp::Lt => l < r,
                CmpOp::Gt => l > r,
                CmpOp::LtEq => l <= r,
                CmpOp::GtEq => l >= r,
            })
        }
        CondKind::And(l, r) => match (const_cond_value(l), const_cond_value(r)) {
            (Some(false), _) => Some(false),
            (Some(true), r) => r,
            (None, Some(false)) => Some(false),
            (None, _) => None,
        },
        CondKind::Or(l, r) => match (const_cond_value(l), const_cond_value(r)) {
            (Some(true), _) => Some(true),
            (Some(false), r) => r,
            (None, Some(true)) => Some(true),
            (None, _) => None,
        },
        CondKind::Not(inner) => const_cond_value(inner).map(|v| !v),
        CondKind::Paren(inner) => const_cond_value(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::Parser;
    use crate::compiler::Lexer;

    fn first_cond(text: &str) -> Cond {
        let src = format!("main () : proc {{ if ({}) ; }}", text);
        let tokens = Lexer::new(&src).tokenize().unwrap();
        let mut prog = Parser::parse(&tokens).unwrap();
        let root = prog.root;
        match prog.func_mut(root).body.remove(0) {
            crate::compiler::ast::Stmt::If { cond, .. } => cond,
            other => panic!("Expected if, got {:?}", other),
        }
    }

    #[test]
    fn folds_literal_arithmetic() {
        for (text, expected) in vec![
            ("1 + 2 * 3 = 7", Some(true)),
            ("10 / 3 = 3", Some(true)),
            ("10 % 3 = 1", Some(true)),
            ("-2 < -1", Some(true)),
            ("0 < 1", Some(true)),
            ("1 / 0 = 0", None),
        ] {
            assert_eq!(const_cond_value(&first_cond(text)), expected, "{}", text);
        }
    }

    #[test]
    fn identifiers_are_not_constant() {
        assert_eq!(const_cond_value(&first_cond("x < 1")), None);
    }

    #[test]
    fn boolean_operators_fold_with_partial_knowledge() {
        for (text, expected) in vec![
            ("0 < 1 or x = 2", Some(true)),
            ("1 < 0 and x = 2", Some(false)),
            ("0 < 1 and x = 2", None),
            ("not (1 = 2)", Some(true)),
            ("x = 2 or 0 < 1", Some(true)),
        ] {
            assert_eq!(const_cond_value(&first_cond(text)), expected, "{}", text);
        }
    }
}
