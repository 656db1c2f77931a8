
pub(crate) mod lexer;
pub(crate) mod tokens;

#[derive(Clone, Debug, PartialEq)]
pub struct LexerError {
    line: u32,
    kind: LexerErrorKind,
}

impl LexerError {
    pub fn new(line: u32, kind: LexerErrorKind) -> LexerError {
        LexerError { line, kind }
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LexerErrorKind {
    InvalidCharacter(char),
    InvalidEscapeSequence(char),
    ExpectedEscapeCharacter,
    InvalidInteger(String),
    UnterminatedString,
    UnterminatedChar,
    UnterminatedComment,
    EmptyCharLiteral,
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use LexerErrorKind::*;
        let msg = match &self.kind {
            InvalidCharacter(c) => format!("Invalid character {:?}", c),
            InvalidEscapeSequence(c) => format!("Invalid escape sequence \\{}", c),
            ExpectedEscapeCharacter => "Expected an escape character after \\".into(),
            InvalidInteger(s) => format!("Invalid integer constant {}", s),
            UnterminatedString => "Unterminated string literal".into(),
            UnterminatedChar => "Unterminated character literal".into(),
            UnterminatedComment => "Unterminated block comment".into(),
            EmptyCharLiteral => "Empty character literal".into(),
        };
        f.write_fmt(format_args!("L{}: {}", self.line, msg))
    }
}
