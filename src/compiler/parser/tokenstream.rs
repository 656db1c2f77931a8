use super::{ParserError, ParserErrorKind};
use crate::compiler::lexer::tokens::{Lex, Token};

/// A cursor over the lexer's token vector.  The index can be saved and
/// restored, which the parser uses for its single backtracking point
/// (telling a parenthesised condition from a parenthesised expression).
pub struct TokenStream<'a> {
    tokens: &'a [Token],
    index: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [Token]) -> TokenStream<'a> {
        TokenStream { tokens, index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, i: usize) {
        self.index = i;
    }

    /// The line of the current token, or of the last token when the
    /// stream is exhausted.
    pub fn line(&self) -> u32 {
        self.tokens
            .get(self.index)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    pub fn peek(&self) -> Option<&Lex> {
        self.tokens.get(self.index).map(|t| &t.lex)
    }

    pub fn peek_at(&self, offset: usize) -> Option<&Lex> {
        self.tokens.get(self.index + offset).map(|t| &t.lex)
    }

    pub fn next(&mut self) -> Option<Lex> {
        let t = self.tokens.get(self.index).map(|t| t.lex.clone());
        if t.is_some() {
            self.index += 1;
        }
        t
    }

    /// Consumes the current token if it equals `test`.
    pub fn next_if(&mut self, test: &Lex) -> bool {
        if self.peek() == Some(test) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn next_must_be(&mut self, test: &Lex) -> Result<(), ParserError> {
        if self.next_if(test) {
            Ok(())
        } else {
            Err(ParserError::new(
                self.line(),
                ParserErrorKind::ExpectedButFound(vec![test.clone()], self.peek().cloned()),
            ))
        }
    }

    pub fn next_identifier(&mut self) -> Result<String, ParserError> {
        match self.peek() {
            Some(Lex::Identifier(_)) => match self.next() {
                Some(Lex::Identifier(id)) => Ok(id),
                _ => unreachable!(),
            },
            got => Err(ParserError::new(
                self.line(),
                ParserErrorKind::ExpectedIdentifier(got.cloned()),
            )),
        }
    }

    pub fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }
}
