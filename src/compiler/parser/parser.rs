use log::debug;

use crate::compiler::ast::*;
use crate::compiler::lexer::tokens::Lex;

use super::tokenstream::TokenStream;
use super::{ParserError, ParserErrorKind};

type ParserResult<T> = Result<T, ParserError>;

/**
Recursive-descent parser for Mica.  A program is a single function
definition:

```text
func-def   = header local-def* "{" stmt* "}"
header     = id "(" [ fpar-def { ";" fpar-def } ] ")" ":" ret-type
local-def  = var-def | header ";" | func-def
```

Function definitions are appended to an arena as they complete, so a
nested definition always has a smaller [`FuncId`] than the function that
contains it; the root procedure is pushed last and recorded in
[`Program::root`].

The grammar is LL(2) except for one spot: inside a condition, `(` may
open either a parenthesised condition or a parenthesised expression on
the left of a relational operator.  The parser first attempts the
comparison and rewinds the token stream when that fails.
*/
pub struct Parser<'a> {
    stream: TokenStream<'a>,
    funcs: Vec<FuncDef>,
}

impl<'a> Parser<'a> {
    pub fn parse(tokens: &'a [crate::compiler::lexer::tokens::Token]) -> ParserResult<Program> {
        let mut parser = Parser {
            stream: TokenStream::new(tokens),
            funcs: Vec::new(),
        };
        let header = parser.header()?;
        let root = parser.func_def(header)?;
        if !parser.stream.at_end() {
            return Err(parser.err(ParserErrorKind::TokensAfterProgram));
        }
        debug!("Parsed {} function definitions", parser.funcs.len());
        Ok(Program {
            funcs: parser.funcs,
            root,
        })
    }

    fn err(&self, kind: ParserErrorKind) -> ParserError {
        ParserError::new(self.stream.line(), kind)
    }

    fn func_def(&mut self, header: Header) -> ParserResult<FuncId> {
        let mut local_defs = Vec::new();
        loop {
            match self.stream.peek() {
                Some(Lex::Var) => local_defs.push(LocalDef::Var(self.var_def()?)),
                Some(Lex::Identifier(_)) => {
                    let line = self.stream.line();
                    let nested = self.header()?;
                    if self.stream.next_if(&Lex::Semicolon) {
                        local_defs.push(LocalDef::Decl(FuncDecl {
                            header: nested,
                            line,
                            def: None,
                            is_redundant: false,
                        }));
                    } else {
                        let id = self.func_def(nested)?;
                        local_defs.push(LocalDef::Func(id));
                    }
                }
                Some(Lex::LBrace) => break,
                got => {
                    let got = got.cloned();
                    return Err(
                        self.err(ParserErrorKind::ExpectedButFound(vec![Lex::LBrace], got))
                    );
                }
            }
        }
        let body = self.compound()?;

        let id = FuncId(self.funcs.len() as u32);
        self.funcs.push(FuncDef {
            header,
            local_defs,
            body,
            parent: None,
            level: None,
            frame: None,
        });
        Ok(id)
    }

    fn header(&mut self) -> ParserResult<Header> {
        let line = self.stream.line();
        let name = self.stream.next_identifier()?;
        self.stream.next_must_be(&Lex::LParen)?;
        let mut params = Vec::new();
        if self.stream.peek() != Some(&Lex::RParen) {
            loop {
                params.push(self.fpar_def()?);
                if !self.stream.next_if(&Lex::Semicolon) {
                    break;
                }
            }
        }
        self.stream.next_must_be(&Lex::RParen)?;
        self.stream.next_must_be(&Lex::Colon)?;
        let ret = self.ret_type()?;
        Ok(Header {
            name,
            params,
            ret,
            line,
            label: None,
        })
    }

    fn fpar_def(&mut self) -> ParserResult<FparDef> {
        let line = self.stream.line();
        let mut names = vec![self.stream.next_identifier()?];
        while self.stream.next_if(&Lex::Comma) {
            names.push(self.stream.next_identifier()?);
        }
        self.stream.next_must_be(&Lex::Colon)?;
        let by_ref = self.stream.next_if(&Lex::Ref);
        let ty = self.par_type()?;
        Ok(FparDef {
            names,
            by_ref,
            ty,
            line,
        })
    }

    /// Parameter types may leave the outermost dimension open (`char[]`).
    fn par_type(&mut self) -> ParserResult<Type> {
        let base = self.data_type()?;
        let mut dims = Vec::new();
        while self.stream.next_if(&Lex::LBracket) {
            if self.stream.next_if(&Lex::RBracket) {
                if !dims.is_empty() {
                    return Err(self.err(ParserErrorKind::OpenDimNotOutermost));
                }
                dims.push(ArraySize::Open);
            } else {
                dims.push(ArraySize::Fixed(self.int_const()?));
                self.stream.next_must_be(&Lex::RBracket)?;
            }
        }
        Ok(Self::build_array(base, dims))
    }

    fn var_def(&mut self) -> ParserResult<VarDef> {
        let line = self.stream.line();
        self.stream.next_must_be(&Lex::Var)?;
        let mut names = vec![self.stream.next_identifier()?];
        while self.stream.next_if(&Lex::Comma) {
            names.push(self.stream.next_identifier()?);
        }
        self.stream.next_must_be(&Lex::Colon)?;
        let base = self.data_type()?;
        let mut dims = Vec::new();
        while self.stream.next_if(&Lex::LBracket) {
            dims.push(ArraySize::Fixed(self.int_const()?));
            self.stream.next_must_be(&Lex::RBracket)?;
        }
        self.stream.next_must_be(&Lex::Semicolon)?;
        Ok(VarDef {
            names,
            ty: Self::build_array(base, dims),
            line,
        })
    }

    /// Wraps `base` in `Array` layers so that the first dimension written
    /// in source is the outermost one in the type.
    fn build_array(base: Type, dims: Vec<ArraySize>) -> Type {
        let mut ty = base;
        for size in dims.into_iter().rev() {
            ty = Type::array(ty, size);
        }
        ty
    }

    fn data_type(&mut self) -> ParserResult<Type> {
        if self.stream.next_if(&Lex::Int) {
            Ok(Type::Int)
        } else if self.stream.next_if(&Lex::Char) {
            Ok(Type::Char)
        } else {
            let got = self.stream.peek().cloned();
            Err(self.err(ParserErrorKind::ExpectedButFound(
                vec![Lex::Int, Lex::Char],
                got,
            )))
        }
    }

    fn ret_type(&mut self) -> ParserResult<Type> {
        if self.stream.next_if(&Lex::Proc) {
            Ok(Type::Proc)
        } else {
            self.data_type().map_err(|_| {
                let got = self.stream.peek().cloned();
                self.err(ParserErrorKind::ExpectedButFound(
                    vec![Lex::Int, Lex::Char, Lex::Proc],
                    got,
                ))
            })
        }
    }

    fn int_const(&mut self) -> ParserResult<u32> {
        match self.stream.peek() {
            Some(Lex::Integer(n)) => {
                let n = *n;
                self.stream.next();
                if n < 0 || n > u32::MAX as i64 {
                    Err(self.err(ParserErrorKind::ArrayDimTooLarge(n)))
                } else {
                    Ok(n as u32)
                }
            }
            got => {
                let got = got.cloned();
                Err(self.err(ParserErrorKind::ExpectedIntegerConstant(got)))
            }
        }
    }

    fn compound(&mut self) -> ParserResult<Vec<Stmt>> {
        self.stream.next_must_be(&Lex::LBrace)?;
        let mut stmts = Vec::new();
        while !self.stream.next_if(&Lex::RBrace) {
            if self.stream.at_end() {
                return Err(self.err(ParserErrorKind::ExpectedButFound(vec![Lex::RBrace], None)));
            }
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn statement(&mut self) -> ParserResult<Stmt> {
        match self.stream.peek() {
            Some(Lex::Semicolon) => {
                self.stream.next();
                Ok(Stmt::Empty)
            }
            Some(Lex::LBrace) => Ok(Stmt::Block(self.compound()?)),
            Some(Lex::If) => {
                self.stream.next();
                self.stream.next_must_be(&Lex::LParen)?;
                let cond = self.cond()?;
                self.stream.next_must_be(&Lex::RParen)?;
                let then = Box::new(self.statement()?);
                let els = if self.stream.next_if(&Lex::Else) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If { cond, then, els })
            }
            Some(Lex::While) => {
                self.stream.next();
                self.stream.next_must_be(&Lex::LParen)?;
                let cond = self.cond()?;
                self.stream.next_must_be(&Lex::RParen)?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::While(cond, body))
            }
            Some(Lex::Return) => {
                let line = self.stream.line();
                self.stream.next();
                if self.stream.next_if(&Lex::Semicolon) {
                    Ok(Stmt::Return(None, line))
                } else {
                    let e = self.expr()?;
                    self.stream.next_must_be(&Lex::Semicolon)?;
                    Ok(Stmt::Return(Some(e), line))
                }
            }
            Some(Lex::Identifier(_)) if self.stream.peek_at(1) == Some(&Lex::LParen) => {
                let call = self.call()?;
                self.stream.next_must_be(&Lex::Semicolon)?;
                Ok(Stmt::Call(call))
            }
            Some(Lex::Identifier(_)) | Some(Lex::StringLit(_)) => {
                let lv = self.lvalue()?;
                self.stream.next_must_be(&Lex::Assign)?;
                let e = self.expr()?;
                self.stream.next_must_be(&Lex::Semicolon)?;
                Ok(Stmt::Assign(lv, e))
            }
            got => {
                let got = got.cloned();
                Err(self.err(ParserErrorKind::ExpectedStatement(got)))
            }
        }
    }

    fn call(&mut self) -> ParserResult<Call> {
        let line = self.stream.line();
        let name = self.stream.next_identifier()?;
        self.stream.next_must_be(&Lex::LParen)?;
        let mut args = Vec::new();
        if self.stream.peek() != Some(&Lex::RParen) {
            loop {
                args.push(self.expr()?);
                if !self.stream.next_if(&Lex::Comma) {
                    break;
                }
            }
        }
        self.stream.next_must_be(&Lex::RParen)?;
        Ok(Call {
            name,
            args,
            line,
            info: None,
        })
    }

    fn lvalue(&mut self) -> ParserResult<LValue> {
        let line = self.stream.line();
        let kind = match self.stream.peek() {
            Some(Lex::Identifier(_)) => LValueKind::Id(self.stream.next_identifier()?),
            Some(Lex::StringLit(_)) => match self.stream.next() {
                Some(Lex::StringLit(bytes)) => LValueKind::Str(bytes),
                _ => unreachable!(),
            },
            got => {
                let got = got.cloned();
                return Err(self.err(ParserErrorKind::ExpectedIdentifier(got)));
            }
        };
        let mut lv = LValue {
            kind,
            line,
            lv_type: None,
        };
        while self.stream.next_if(&Lex::LBracket) {
            let index = self.expr()?;
            self.stream.next_must_be(&Lex::RBracket)?;
            lv = LValue {
                kind: LValueKind::Index(Box::new(lv), Box::new(index)),
                line,
                lv_type: None,
            };
        }
        Ok(lv)
    }

    fn expr(&mut self) -> ParserResult<Expr> {
        let line = self.stream.line();
        let sign = if self.stream.next_if(&Lex::Add) {
            Some(Sign::Plus)
        } else if self.stream.next_if(&Lex::Minus) {
            Some(Sign::Minus)
        } else {
            None
        };
        let mut e = self.term()?;
        if let Some(sign) = sign {
            e = Expr {
                kind: ExprKind::Signed(sign, Box::new(e)),
                line,
            };
        }
        loop {
            let op = if self.stream.next_if(&Lex::Add) {
                ArithOp::Add
            } else if self.stream.next_if(&Lex::Minus) {
                ArithOp::Sub
            } else {
                break;
            };
            let rhs = self.term()?;
            e = Expr {
                kind: ExprKind::Binary(op, Box::new(e), Box::new(rhs)),
                line,
            };
        }
        Ok(e)
    }

    fn term(&mut self) -> ParserResult<Expr> {
        let line = self.stream.line();
        let mut e = self.factor()?;
        loop {
            let op = if self.stream.next_if(&Lex::Mul) {
                ArithOp::Mul
            } else if self.stream.next_if(&Lex::Div) {
                ArithOp::Div
            } else if self.stream.next_if(&Lex::Mod) {
                ArithOp::Mod
            } else {
                break;
            };
            let rhs = self.factor()?;
            e = Expr {
                kind: ExprKind::Binary(op, Box::new(e), Box::new(rhs)),
                line,
            };
        }
        Ok(e)
    }

    fn factor(&mut self) -> ParserResult<Expr> {
        let line = self.stream.line();
        let kind = match self.stream.peek() {
            Some(Lex::Integer(n)) => {
                let n = *n;
                self.stream.next();
                ExprKind::IntLit(n)
            }
            Some(Lex::CharLit(c)) => {
                let c = *c;
                self.stream.next();
                ExprKind::CharLit(c)
            }
            Some(Lex::LParen) => {
                self.stream.next();
                let e = self.expr()?;
                self.stream.next_must_be(&Lex::RParen)?;
                ExprKind::Paren(Box::new(e))
            }
            Some(Lex::Identifier(_)) if self.stream.peek_at(1) == Some(&Lex::LParen) => {
                ExprKind::Call(self.call()?)
            }
            Some(Lex::Identifier(_)) | Some(Lex::StringLit(_)) => {
                ExprKind::LValue(self.lvalue()?)
            }
            got => {
                let got = got.cloned();
                return Err(self.err(ParserErrorKind::ExpectedExpression(got)));
            }
        };
        Ok(Expr { kind, line })
    }

    fn cond(&mut self) -> ParserResult<Cond> {
        let line = self.stream.line();
        let mut c = self.cond_and()?;
        while self.stream.next_if(&Lex::Or) {
            let rhs = self.cond_and()?;
            c = Cond {
                kind: CondKind::Or(Box::new(c), Box::new(rhs)),
                line,
            };
        }
        Ok(c)
    }

    fn cond_and(&mut self) -> ParserResult<Cond> {
        let line = self.stream.line();
        let mut c = self.cond_not()?;
        while self.stream.next_if(&Lex::And) {
            let rhs = self.cond_not()?;
            c = Cond {
                kind: CondKind::And(Box::new(c), Box::new(rhs)),
                line,
            };
        }
        Ok(c)
    }

    fn cond_not(&mut self) -> ParserResult<Cond> {
        let line = self.stream.line();
        if self.stream.next_if(&Lex::Not) {
            let c = self.cond_not()?;
            Ok(Cond {
                kind: CondKind::Not(Box::new(c)),
                line,
            })
        } else {
            self.cond_atom()
        }
    }

    /// `(` may open a parenthesised condition or the parenthesised left
    /// operand of a comparison; try the comparison first and rewind when
    /// it does not pan out.
    fn cond_atom(&mut self) -> ParserResult<Cond> {
        if self.stream.peek() == Some(&Lex::LParen) {
            let save = self.stream.index();
            if let Ok(c) = self.comparison() {
                return Ok(c);
            }
            self.stream.set_index(save);

            let line = self.stream.line();
            self.stream.next_must_be(&Lex::LParen)?;
            let c = self.cond()?;
            self.stream.next_must_be(&Lex::RParen)?;
            Ok(Cond {
                kind: CondKind::Paren(Box::new(c)),
                line,
            })
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> ParserResult<Cond> {
        let line = self.stream.line();
        let left = self.expr()?;
        let op = match self.stream.peek() {
            Some(Lex::Eq) => CmpOp::Eq,
            Some(Lex::Neq) => CmpOp::Neq,
            Some(Lex::Ls) => CmpOp::Lt,
            Some(Lex::Gr) => CmpOp::Gt,
            Some(Lex::LsEq) => CmpOp::LtEq,
            Some(Lex::GrEq) => CmpOp::GtEq,
            got => {
                let got = got.cloned();
                return Err(self.err(ParserErrorKind::ExpectedButFound(
                    vec![
                        Lex::Eq,
                        Lex::Neq,
                        Lex::Ls,
                        Lex::Gr,
                        Lex::LsEq,
                        Lex::GrEq,
                    ],
                    got,
                )));
            }
        };
        self.stream.next();
        let right = self.expr()?;
        Ok(Cond {
            kind: CondKind::Compare(op, Box::new(left), Box::new(right)),
            line,
        })
    }
}
