mod tests;
mod tokenstream;

pub mod parser;

pub use parser::Parser;

use super::lexer::tokens::Lex;

#[derive(Clone, Debug, PartialEq)]
pub struct ParserError {
    line: u32,
    kind: ParserErrorKind,
}

impl ParserError {
    pub fn new(line: u32, kind: ParserErrorKind) -> ParserError {
        ParserError { line, kind }
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParserErrorKind {
    ExpectedButFound(Vec<Lex>, Option<Lex>),
    ExpectedIdentifier(Option<Lex>),
    ExpectedExpression(Option<Lex>),
    ExpectedCondition(Option<Lex>),
    ExpectedStatement(Option<Lex>),
    ExpectedIntegerConstant(Option<Lex>),
    ArrayDimTooLarge(i64),
    OpenDimNotOutermost,
    TokensAfterProgram,
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ParserErrorKind::*;

        let found = |t: &Option<Lex>| match t {
            Some(lex) => format!("{}", lex),
            None => "end of input".into(),
        };

        let msg = match &self.kind {
            ExpectedButFound(expected, got) => {
                let expected = expected
                    .iter()
                    .map(|l| format!("{}", l))
                    .collect::<Vec<String>>()
                    .join(" or ");
                format!("Expected {}, but found {}", expected, found(got))
            }
            ExpectedIdentifier(got) => format!("Expected identifier, but found {}", found(got)),
            ExpectedExpression(got) => format!("Expected expression, but found {}", found(got)),
            ExpectedCondition(got) => format!("Expected condition, but found {}", found(got)),
            ExpectedStatement(got) => format!("Expected statement, but found {}", found(got)),
            ExpectedIntegerConstant(got) => {
                format!("Expected integer constant, but found {}", found(got))
            }
            ArrayDimTooLarge(n) => format!("Array dimension {} is too large", n),
            OpenDimNotOutermost => "Only the outermost array dimension may be omitted".into(),
            TokensAfterProgram => "Unexpected tokens after the top-level procedure".into(),
        };
        f.write_fmt(format_args!("L{}: {}", self.line, msg))
    }
}
