#[cfg(test)]
mod analyzer_tests {
    use crate::compiler::ast::*;
    use crate::compiler::parser::Parser;
    use crate::compiler::semantics::analyzer::analyze;
    use crate::compiler::semantics::{SemanticError, SemanticErrorKind};
    use crate::compiler::Lexer;

    fn analyzed(text: &str) -> Result<Program, SemanticError> {
        let tokens = Lexer::new(text).tokenize().expect("Expected valid tokens");
        let mut prog = Parser::parse(&tokens).expect("Expected a valid program");
        analyze(&mut prog).map(|_| prog)
    }

    fn expect_err(text: &str) -> SemanticErrorKind {
        analyzed(text).expect_err("Expected a semantic error").kind().clone()
    }

    #[test]
    fn well_typed_programs_pass() {
        for text in vec![
            "main () : proc {}",
            "main () : proc var x : int; { x := 1 + 2; }",
            "main () : proc var c : char; { c := 'a'; }",
            "main () : proc
               var s : char[10];
             { strcpy(s, \"hi\"); writeInteger(strlen(s)); }",
            "main () : proc
               f (n : int) : int { return n * 2; }
             { writeInteger(f(21)); }",
            "main () : proc
               var m : int[2][3];
             { m[1][2] := 5; writeInteger(m[1][2]); }",
            "main () : proc
               var x : int;
             { while (x < 3) x := x + 1; }",
        ] {
            assert!(analyzed(text).is_ok(), "rejected: {}", text);
        }
    }

    #[test]
    fn undefined_identifier() {
        assert!(matches!(
            expect_err("main () : proc { x := 1; }"),
            SemanticErrorKind::Undefined(name) if name == "x"
        ));
        assert!(matches!(
            expect_err("main () : proc { f(); }"),
            SemanticErrorKind::Undefined(name) if name == "f"
        ));
    }

    #[test]
    fn main_function_constraints() {
        assert!(matches!(
            expect_err("main () : int { return 1; }"),
            SemanticErrorKind::MainBadReturnType(Type::Int)
        ));
        assert!(matches!(
            expect_err("main (x : int) : proc {}"),
            SemanticErrorKind::MainHasParameters
        ));
    }

    #[test]
    fn name_collisions() {
        assert!(matches!(
            expect_err("main () : proc f (a, a : int) : proc {} {}"),
            SemanticErrorKind::DuplicateParameter(p, f) if p == "a" && f == "f"
        ));
        assert!(matches!(
            expect_err("main () : proc var x : int; var x : char; {}"),
            SemanticErrorKind::DuplicateVariable(name) if name == "x"
        ));
        assert!(matches!(
            expect_err("main () : proc f (x : int) : proc var x : char; {} {}"),
            SemanticErrorKind::VariableParameterCollision(name) if name == "x"
        ));
        assert!(matches!(
            expect_err("main () : proc g () : proc {} var g : int; {}"),
            SemanticErrorKind::VariableFunctionCollision(name) if name == "g"
        ));
        assert!(matches!(
            expect_err("main () : proc var g : int; g () : proc {} {}"),
            SemanticErrorKind::FunctionNameTaken(name) if name == "g"
        ));
    }

    #[test]
    fn forward_declaration_and_mutual_recursion() {
        let prog = analyzed(
            "main () : proc
               g (n : int) : proc;
               f (n : int) : proc { g(n - 1); }
               g (n : int) : proc { if (n > 0) f(n); }
             { f(2); }",
        )
        .expect("Expected mutual recursion to analyze");

        let root = prog.func(prog.root);
        match &root.local_defs[0] {
            LocalDef::Decl(decl) => {
                assert!(!decl.is_redundant);
                let def = decl.def.expect("declaration should be linked");
                assert_eq!(prog.func(def).header.name, "g");
            }
            other => panic!("Expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn redundant_forward_declaration_is_flagged_not_fatal() {
        let prog = analyzed(
            "main () : proc
               g () : proc;
               g () : proc;
               g () : proc {}
             { g(); }",
        )
        .expect("Redundant declarations are only warnings");
        let root = prog.func(prog.root);
        match (&root.local_defs[0], &root.local_defs[1]) {
            (LocalDef::Decl(first), LocalDef::Decl(second)) => {
                assert!(!first.is_redundant);
                assert!(second.is_redundant);
            }
            other => panic!("Unexpected local defs {:?}", other),
        }
    }

    #[test]
    fn declaration_without_definition_is_fatal() {
        assert!(matches!(
            expect_err("main () : proc g () : proc; {}"),
            SemanticErrorKind::DeclaredNotDefined(name) if name == "g"
        ));
    }

    #[test]
    fn declaration_mismatches() {
        // Parameter count differs: overload attempt.
        assert!(matches!(
            expect_err(
                "main () : proc
                   f (x : int) : proc;
                   f (x : int; y : int) : proc {}
                 {}"
            ),
            SemanticErrorKind::Overloaded(name) if name == "f"
        ));
        // Return type differs.
        assert!(matches!(
            expect_err(
                "main () : proc
                   f () : int;
                   f () : proc {}
                 {}"
            ),
            SemanticErrorKind::DeclReturnMismatch(..)
        ));
        // Passing mode differs.
        assert!(matches!(
            expect_err(
                "main () : proc
                   f (x : int) : proc;
                   f (x : ref int) : proc {}
                 {}"
            ),
            SemanticErrorKind::DeclParameterMismatch(..)
        ));
        // Same function defined twice.
        assert!(matches!(
            expect_err(
                "main () : proc
                   f () : proc {}
                   f () : proc {}
                 {}"
            ),
            SemanticErrorKind::Redefinition(name) if name == "f"
        ));
    }

    #[test]
    fn array_ref_without_keyword_matches_ref_declaration() {
        // Arrays travel by reference whether or not `ref` is written.
        assert!(analyzed(
            "main () : proc
               f (s : char[]) : proc;
               f (s : ref char[]) : proc {}
             {}"
        )
        .is_ok());
    }

    #[test]
    fn open_array_parameter_accepts_any_fixed_dimension() {
        assert!(analyzed(
            "main () : proc
               var c : char[5];
               f (s : ref char[]) : proc {}
             { f(c); }"
        )
        .is_ok());

        assert!(matches!(
            expect_err(
                "main () : proc
                   var c : int[5];
                   f (s : ref char[]) : proc {}
                 { f(c); }"
            ),
            SemanticErrorKind::ArgTypeMismatch(..)
        ));
    }

    #[test]
    fn by_reference_argument_must_be_lvalue() {
        assert!(matches!(
            expect_err(
                "main () : proc
                   var x : int;
                   f (n : ref int) : proc {}
                 { f(x + 1); }"
            ),
            SemanticErrorKind::RefArgNotLValue(name, 0) if name == "f"
        ));
        // Parenthesised lvalues are still lvalues.
        assert!(analyzed(
            "main () : proc
               var x : int;
               f (n : ref int) : proc {}
             { f((x)); }"
        )
        .is_ok());
    }

    #[test]
    fn argument_count_is_checked() {
        assert!(matches!(
            expect_err("main () : proc { writeInteger(1, 2); }"),
            SemanticErrorKind::WrongArgCount(name, 1, 2) if name == "writeInteger"
        ));
    }

    #[test]
    fn type_errors() {
        assert!(matches!(
            expect_err("main () : proc var c : char; { c := c + 1; }"),
            SemanticErrorKind::ArithOperandNotInt(Type::Char)
        ));
        assert!(matches!(
            expect_err("main () : proc var x : int; { x := 'a'; }"),
            SemanticErrorKind::AssignMismatch(Type::Int, Type::Char)
        ));
        assert!(matches!(
            expect_err("main () : proc var x : int; var c : char; { if (x = c) ; }"),
            SemanticErrorKind::CompareMismatch(Type::Int, Type::Char)
        ));
        assert!(matches!(
            expect_err("main () : proc var a : int[3]; { a := 1; }"),
            SemanticErrorKind::AssignToArray(_)
        ));
        assert!(matches!(
            expect_err("main () : proc f () : int { return 1; } { f := 2; }"),
            SemanticErrorKind::AssignToFunction(name) if name == "f"
        ));
        assert!(matches!(
            expect_err("main () : proc var x : int; { x := x[0]; }"),
            SemanticErrorKind::IndexNonArray(Type::Int)
        ));
        assert!(matches!(
            expect_err("main () : proc var a : int[3]; var c : char; { a[c] := 1; }"),
            SemanticErrorKind::IndexNotInt(Type::Char)
        ));
    }

    #[test]
    fn string_literals_type_and_bounds() {
        // "abc" is char[4]; indexing 0..=2 is fine, 3 hits the NUL slot
        // boundary and is rejected statically.
        assert!(analyzed("main () : proc var c : char; { c := \"abc\"[2]; }").is_ok());
        assert!(matches!(
            expect_err("main () : proc var c : char; { c := \"abc\"[3]; }"),
            SemanticErrorKind::IndexOutOfBounds(3, 4)
        ));
        assert!(matches!(
            expect_err("main () : proc { \"abc\"[0] := 'x'; }"),
            SemanticErrorKind::AssignToStringLiteral
        ));
    }

    #[test]
    fn static_bounds_checking() {
        assert!(matches!(
            expect_err("main () : proc var a : int[3]; { a[3] := 1; }"),
            SemanticErrorKind::IndexOutOfBounds(3, 3)
        ));
        assert!(matches!(
            expect_err("main () : proc var a : int[3]; { a[1 - 2] := 1; }"),
            SemanticErrorKind::IndexOutOfBounds(-1, 3)
        ));
        // Non-constant indices are checked at run time only.
        assert!(analyzed("main () : proc var a : int[3]; var i : int; { a[i + 7] := 1; }").is_ok());
    }

    #[test]
    fn zero_array_dimension_rejected() {
        assert!(matches!(
            expect_err("main () : proc var a : int[0]; {}"),
            SemanticErrorKind::ZeroArrayDim(name) if name == "a"
        ));
        assert!(matches!(
            expect_err("main () : proc f (a : int[0]) : proc {} {}"),
            SemanticErrorKind::ZeroArrayDim(_)
        ));
    }

    #[test]
    fn return_type_of_body_must_match_header() {
        // Missing return on a path.
        assert!(matches!(
            expect_err(
                "main () : proc
                   f (n : int) : int { if (n > 0) return 1; }
                 { writeInteger(f(1)); }"
            ),
            SemanticErrorKind::BodyReturnMismatch(name, Type::Int, Type::Proc) if name == "f"
        ));
        // Both arms returning makes the if/else return.
        assert!(analyzed(
            "main () : proc
               f (n : int) : int { if (n > 0) return 1; else return 0; }
             { writeInteger(f(1)); }"
        )
        .is_ok());
        // Mismatching arms are fatal.
        assert!(matches!(
            expect_err(
                "main () : proc
                   f (n : int) : int { if (n > 0) return 1; else return; }
                 { writeInteger(f(1)); }"
            ),
            SemanticErrorKind::IfArmMismatch(Type::Int, Type::Proc)
        ));
        // A constant-true while whose body returns satisfies the check.
        assert!(analyzed(
            "main () : proc
               f () : int { while (0 < 1) return 7; }
             { writeInteger(f()); }"
        )
        .is_ok());
    }

    #[test]
    fn call_annotations_are_filled() {
        let prog = analyzed(
            "main () : proc
               f () : int { return 1; }
             { writeInteger(f()); }",
        )
        .unwrap();
        let root = prog.func(prog.root);
        match &root.body[0] {
            Stmt::Call(call) => {
                let info = call.info.as_ref().expect("call should be annotated");
                assert_eq!(info.label, "writeInteger");
                assert!(info.library);
                match &call.args[0].kind {
                    ExprKind::Call(inner) => {
                        let info = inner.info.as_ref().expect("call should be annotated");
                        assert_eq!(info.label, "root_main_f");
                        assert_eq!(info.ret, Type::Int);
                        assert!(!info.library);
                        assert_eq!(info.level, 1);
                    }
                    other => panic!("Expected call argument, got {:?}", other),
                }
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn parent_links_and_levels() {
        let prog = analyzed(
            "main () : proc
               p () : proc
                 q () : proc {}
               { q(); }
             { p(); }",
        )
        .unwrap();
        let root = prog.func(prog.root);
        assert_eq!(root.parent, None);
        assert_eq!(root.level, Some(0));

        let p = match &root.local_defs[0] {
            LocalDef::Func(id) => *id,
            other => panic!("Expected nested def, got {:?}", other),
        };
        assert_eq!(prog.func(p).parent, Some(prog.root));
        assert_eq!(prog.func(p).level, Some(1));
        assert_eq!(prog.func(p).header.label.as_deref(), Some("root_main_p"));

        let q = match &prog.func(p).local_defs[0] {
            LocalDef::Func(id) => *id,
            other => panic!("Expected nested def, got {:?}", other),
        };
        assert_eq!(prog.func(q).parent, Some(p));
        assert_eq!(prog.func(q).level, Some(2));
        assert_eq!(prog.func(q).header.label.as_deref(), Some("root_main_p_q"));
    }

    #[test]
    fn analysis_is_idempotent() {
        let text = "main () : proc
               g () : int;
               g () : int { return 2; }
             { writeInteger(g()); }";
        let tokens = Lexer::new(text).tokenize().unwrap();
        let mut prog = Parser::parse(&tokens).unwrap();
        analyze(&mut prog).unwrap();

        let labels: Vec<_> = prog
            .funcs
            .iter()
            .map(|f| (f.header.label.clone(), f.parent, f.level))
            .collect();

        analyze(&mut prog).unwrap();
        let labels2: Vec<_> = prog
            .funcs
            .iter()
            .map(|f| (f.header.label.clone(), f.parent, f.level))
            .collect();
        assert_eq!(labels, labels2);
    }
}
