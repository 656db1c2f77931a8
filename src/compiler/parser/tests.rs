#[cfg(test)]
pub mod tests {
    use crate::compiler::ast::*;
    use crate::compiler::parser::Parser;
    use crate::compiler::Lexer;

    fn parse(text: &str) -> Program {
        let tokens = Lexer::new(text).tokenize().expect("Expected valid tokens");
        Parser::parse(&tokens).expect("Expected a valid program")
    }

    fn parse_err(text: &str) -> String {
        let tokens = Lexer::new(text).tokenize().expect("Expected valid tokens");
        format!("{}", Parser::parse(&tokens).unwrap_err())
    }

    #[test]
    fn empty_program() {
        let prog = parse("main () : proc {}");
        let root = prog.func(prog.root);
        assert_eq!(root.header.name, "main");
        assert_eq!(root.header.ret, Type::Proc);
        assert!(root.header.params.is_empty());
        assert!(root.local_defs.is_empty());
        assert!(root.body.is_empty());
    }

    #[test]
    fn header_parameters() {
        let prog = parse("f (a, b : int; s : ref char[]) : int { return 0; }");
        let root = prog.func(prog.root);
        let params = root.header.expand_params();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].name, "a");
        assert_eq!(params[0].ty, Type::Int);
        assert!(!params[0].by_ref);
        assert_eq!(params[2].name, "s");
        assert_eq!(params[2].ty, Type::array(Type::Char, ArraySize::Open));
        assert!(params[2].by_ref);
    }

    #[test]
    fn multi_dimensional_types() {
        let prog = parse(
            "main () : proc
               var m : int[2][3];
             {}",
        );
        let root = prog.func(prog.root);
        match &root.local_defs[0] {
            LocalDef::Var(v) => {
                assert_eq!(v.names, vec!["m".to_string()]);
                assert_eq!(
                    v.ty,
                    Type::array(
                        Type::array(Type::Int, ArraySize::Fixed(3)),
                        ArraySize::Fixed(2)
                    )
                );
            }
            other => panic!("Expected a variable definition, got {:?}", other),
        }
    }

    #[test]
    fn nested_function_and_forward_declaration() {
        let prog = parse(
            "main () : proc
               g () : int;
               g () : int { return 1; }
             { }",
        );
        let root = prog.func(prog.root);
        assert_eq!(root.local_defs.len(), 2);
        match (&root.local_defs[0], &root.local_defs[1]) {
            (LocalDef::Decl(decl), LocalDef::Func(id)) => {
                assert_eq!(decl.header.name, "g");
                assert_eq!(decl.def, None);
                assert!(!decl.is_redundant);
                assert_eq!(prog.func(*id).header.name, "g");
            }
            other => panic!("Unexpected local defs {:?}", other),
        }
        // The nested definition was pushed before the root.
        assert_eq!(prog.root, FuncId(1));
    }

    #[test]
    fn statements() {
        let prog = parse(
            "main () : proc
               var x : int;
             {
               x := 1 + 2 * 3;
               if (x > 0) x := 0; else ;
               while (x < 10) x := x + 1;
               return;
             }",
        );
        let root = prog.func(prog.root);
        assert_eq!(root.body.len(), 4);
        match &root.body[0] {
            Stmt::Assign(lv, e) => {
                assert!(matches!(&lv.kind, LValueKind::Id(n) if n == "x"));
                // 1 + (2 * 3): addition at the top.
                assert!(matches!(&e.kind, ExprKind::Binary(ArithOp::Add, ..)));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
        assert!(matches!(&root.body[1], Stmt::If { els: Some(_), .. }));
        assert!(matches!(&root.body[2], Stmt::While(..)));
        assert!(matches!(&root.body[3], Stmt::Return(None, _)));
    }

    #[test]
    fn indexed_lvalues() {
        let prog = parse(
            "main () : proc
               var m : int[2][3];
             { m[1][2] := 5; }",
        );
        let root = prog.func(prog.root);
        match &root.body[0] {
            Stmt::Assign(lv, _) => match &lv.kind {
                LValueKind::Index(sub, _) => {
                    assert!(matches!(&sub.kind, LValueKind::Index(..)));
                }
                other => panic!("Expected index lvalue, got {:?}", other),
            },
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn string_literal_lvalue() {
        let prog = parse("main () : proc { writeString(\"hi\"); }");
        let root = prog.func(prog.root);
        match &root.body[0] {
            Stmt::Call(call) => {
                assert_eq!(call.name, "writeString");
                assert!(matches!(
                    &call.args[0].kind,
                    ExprKind::LValue(lv) if matches!(&lv.kind, LValueKind::Str(s) if s == b"hi")
                ));
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn parenthesised_condition_vs_expression() {
        // `(x + 1) > 0` needs the comparison path, `(x > 0 or x < 5)` the
        // condition path; both under the same `(`.
        let prog = parse(
            "main () : proc
               var x : int;
             {
               if ((x + 1) > 0) ;
               if ((x > 0 or x < 5) and not x = 3) ;
             }",
        );
        let root = prog.func(prog.root);
        match &root.body[0] {
            Stmt::If { cond, .. } => {
                assert!(matches!(&cond.kind, CondKind::Compare(CmpOp::Gt, ..)))
            }
            other => panic!("Expected if, got {:?}", other),
        }
        match &root.body[1] {
            Stmt::If { cond, .. } => assert!(matches!(&cond.kind, CondKind::And(..))),
            other => panic!("Expected if, got {:?}", other),
        }
    }

    #[test]
    fn open_dimension_only_outermost() {
        let msg = parse_err("f (s : ref char[3][]) : proc {}");
        assert!(msg.contains("outermost"), "got: {}", msg);
    }

    #[test]
    fn error_messages_carry_lines() {
        let msg = parse_err("main () : proc {\n  x := ;\n}");
        assert!(msg.starts_with("L2:"), "got: {}", msg);
    }

    #[test]
    fn trailing_tokens_rejected() {
        let msg = parse_err("main () : proc {} extra");
        assert!(msg.contains("after the top-level"), "got: {}", msg);
    }
}
