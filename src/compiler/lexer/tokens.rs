#[derive(Clone, Debug, PartialEq)]
pub enum Lex {
    Identifier(String),
    Integer(i64),
    CharLit(u8),
    /// String literal contents after escape processing, without the
    /// trailing NUL the code generator appends.
    StringLit(Vec<u8>),

    Var,
    Ref,
    Int,
    Char,
    Proc,
    If,
    Else,
    While,
    Return,
    And,
    Or,
    Not,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Colon,
    Assign,

    Add,
    Minus,
    Mul,
    Div,
    Mod,

    Eq,
    Neq,
    Ls,
    Gr,
    LsEq,
    GrEq,
}

impl std::fmt::Display for Lex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Lex::*;
        match self {
            Identifier(id) => f.write_fmt(format_args!("identifier {}", id)),
            Integer(i) => f.write_fmt(format_args!("literal {}", i)),
            CharLit(c) => f.write_fmt(format_args!("literal '{}'", (*c as char).escape_default())),
            StringLit(s) => f.write_fmt(format_args!(
                "literal \"{}\"",
                String::from_utf8_lossy(s).escape_default()
            )),
            Var => f.write_str("var"),
            Ref => f.write_str("ref"),
            Int => f.write_str("int"),
            Char => f.write_str("char"),
            Proc => f.write_str("proc"),
            If => f.write_str("if"),
            Else => f.write_str("else"),
            While => f.write_str("while"),
            Return => f.write_str("return"),
            And => f.write_str("and"),
            Or => f.write_str("or"),
            Not => f.write_str("not"),
            LParen => f.write_str("("),
            RParen => f.write_str(")"),
            LBracket => f.write_str("["),
            RBracket => f.write_str("]"),
            LBrace => f.write_str("{"),
            RBrace => f.write_str("}"),
            Comma => f.write_str(","),
            Semicolon => f.write_str(";"),
            Colon => f.write_str(":"),
            Assign => f.write_str(":="),
            Add => f.write_str("+"),
            Minus => f.write_str("-"),
            Mul => f.write_str("*"),
            Div => f.write_str("/"),
            Mod => f.write_str("%"),
            Eq => f.write_str("="),
            Neq => f.write_str("<>"),
            Ls => f.write_str("<"),
            Gr => f.write_str(">"),
            LsEq => f.write_str("<="),
            GrEq => f.write_str(">="),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub lex: Lex,
    pub line: u32,
}

impl Token {
    pub fn new(lex: Lex, line: u32) -> Token {
        Token { lex, line }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.lex.fmt(f)
    }
}
