//! Character stream to tokens. The [`Tokenizer`] owns a growing token
//! buffer and a parenthesis depth counter that persist across feeds until
//! explicitly reset; a feed that leaves the depth positive reports
//! [`Progress::Incomplete`], which is how the REPL accumulates multi-line
//! expressions.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_till, take_while1},
    character::complete::{char, multispace0},
    combinator::value,
    sequence::preceded,
};

use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open,
    Close,
    /// A maximal run of non-whitespace, non-parenthesis, non-semicolon
    /// characters, stored lowercased. Identifiers are therefore
    /// case-insensitive.
    Atom(String),
}

/// Outcome of a feed: `Complete` when every `(` has been matched,
/// `Incomplete` when the caller may supply more input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Complete,
    Incomplete,
}

#[derive(Clone)]
enum Lexeme {
    Open,
    Close,
    Atom(String),
    Comment,
}

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | ';')
}

fn lexeme(input: &str) -> IResult<&str, Lexeme> {
    preceded(
        multispace0,
        alt((
            value(Lexeme::Open, char('(')),
            value(Lexeme::Close, char(')')),
            // A `;` discards the remainder of the line.
            value(Lexeme::Comment, preceded(char(';'), take_till(|c| c == '\n'))),
            take_while1(is_atom_char).map(|s: &str| Lexeme::Atom(s.to_lowercase())),
        )),
    )
    .parse(input)
}

#[derive(Debug, Default)]
pub struct Tokenizer {
    tokens: Vec<Token>,
    depth: usize,
}

impl Tokenizer {
    pub fn new() -> Self {
        Tokenizer::default()
    }

    /// Discard accumulated tokens and depth; the REPL calls this before
    /// every new top-level expression.
    pub fn reset(&mut self) {
        self.tokens.clear();
        self.depth = 0;
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Scan a chunk of input (a REPL line or a whole file) into the token
    /// buffer. A `)` that has no matching `(` is an immediate error; there
    /// is no "too many `)`" incomplete state.
    pub fn feed(&mut self, input: &str) -> Result<Progress, Error> {
        let mut rest = input;
        while !rest.trim_start().is_empty() {
            let (next, lexeme) = lexeme(rest)
                .map_err(|_| Error::Lex(format!("cannot read input near `{}`", rest.trim_start())))?;
            rest = next;
            match lexeme {
                Lexeme::Open => {
                    self.tokens.push(Token::Open);
                    self.depth += 1;
                }
                Lexeme::Close => {
                    if self.depth == 0 {
                        return Err(Error::Lex(
                            "unable to match `)` to any previous `(`".to_string(),
                        ));
                    }
                    self.tokens.push(Token::Close);
                    self.depth -= 1;
                }
                Lexeme::Atom(text) => self.tokens.push(Token::Atom(text)),
                Lexeme::Comment => {}
            }
        }
        Ok(if self.depth == 0 {
            Progress::Complete
        } else {
            Progress::Incomplete
        })
    }
}
