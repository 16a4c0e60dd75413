//! DDL Parser
//!
//! Turns the token sequence into statements, one per line:
//!
//! ```text
//! statement := parameter | connect | create
//! parameter := '@' IDENT value
//! connect   := IDENT ':' IDENT '->' IDENT ':' IDENT
//! create    := IDENT '=' IDENT '(' [ arg (',' arg)* ] ')'
//! arg       := IDENT '=' value
//! value     := IDENT | NUMBER | STRING
//! ```
//!
//! Blank lines are skipped. A statement ends at a line feed or at end of input.

use super::lexer::{LexError, Lexer, Position, Token, TokenKind};
use crate::component::Arguments;
use crate::value::Value;
use std::iter::Peekable;
use thiserror::Error;

/// One end of a connect statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    pub variable: String,
    pub port: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `@NAME value`
    Parameter {
        name: String,
        value: Value,
        position: Position,
    },
    /// `var = Type(arg=value, ...)`
    CreateComponent {
        variable: String,
        type_name: String,
        arguments: Arguments,
        position: Position,
    },
    /// `var:port -> var:port`
    Connect {
        from: Connector,
        to: Connector,
        position: Position,
    },
}

impl Statement {
    /// Position of the statement's first token
    pub fn position(&self) -> Position {
        match self {
            Statement::Parameter { position, .. }
            | Statement::CreateComponent { position, .. }
            | Statement::Connect { position, .. } => *position,
        }
    }

    pub fn line(&self) -> usize {
        self.position().line
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("{position}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: TokenKind,
        position: Position,
    },

    #[error("{position}: expected {expected}, found end of input")]
    UnexpectedEnd {
        expected: &'static str,
        position: Position,
    },

    #[error("{position}: invalid number '{literal}'")]
    InvalidNumber { literal: String, position: Position },

    #[error("{position}: argument '{name}' given more than once")]
    DuplicateArgument { name: String, position: Position },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::Lex(err) => err.position(),
            ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEnd { position, .. }
            | ParseError::InvalidNumber { position, .. }
            | ParseError::DuplicateArgument { position, .. } => *position,
        }
    }
}

impl Token {
    /// Literal value carried by a value token.
    ///
    /// Identifiers `true`/`false` (any case) are Bools and other identifiers are
    /// Strings. Quoted strings are always Strings. Numbers with a '.' are
    /// Floats, without one Integers.
    pub fn to_value(&self) -> Result<Value, ParseError> {
        match self.kind {
            TokenKind::Identifier => Ok(if self.literal.eq_ignore_ascii_case("true") {
                Value::Bool(true)
            } else if self.literal.eq_ignore_ascii_case("false") {
                Value::Bool(false)
            } else {
                Value::String(self.literal.clone())
            }),
            TokenKind::String => Ok(Value::String(self.literal.clone())),
            TokenKind::Number => {
                let parsed = if self.literal.contains('.') {
                    self.literal.parse::<f64>().ok().map(Value::Float)
                } else {
                    self.literal.parse::<i64>().ok().map(Value::Integer)
                };
                parsed.ok_or_else(|| ParseError::InvalidNumber {
                    literal: self.literal.clone(),
                    position: self.position,
                })
            }
            found => Err(ParseError::UnexpectedToken {
                expected: "value",
                found,
                position: self.position,
            }),
        }
    }
}

/// Statement parser over any token source.
///
/// Yields `Err` at most once; the sequence ends after the first error.
pub struct Parser<I>
where
    I: Iterator<Item = Result<Token, LexError>>,
{
    tokens: Peekable<I>,
    last: Position,
    failed: bool,
}

impl<'a> Parser<Lexer<'a>> {
    pub fn from_source(source: &'a str) -> Self {
        Self::new(Lexer::new(source))
    }
}

impl<I> Parser<I>
where
    I: Iterator<Item = Result<Token, LexError>>,
{
    pub fn new(tokens: I) -> Self {
        Self {
            tokens: tokens.peekable(),
            last: Position::default(),
            failed: false,
        }
    }

    /// Next statement, or `Ok(None)` once the input is exhausted
    pub fn parse_statement(&mut self) -> Result<Option<Statement>, ParseError> {
        let first = loop {
            match self.advance()? {
                None => return Ok(None),
                Some(token) if token.kind == TokenKind::Newline => continue,
                Some(token) => break token,
            }
        };

        let statement = match first.kind {
            TokenKind::At => self.parameter(first.position)?,
            TokenKind::Identifier => match self.peek_kind() {
                Some(TokenKind::Colon) => self.connect(first)?,
                Some(TokenKind::Equal) => self.create(first)?,
                _ => return Err(self.unexpected("':' or '='")),
            },
            found => {
                return Err(ParseError::UnexpectedToken {
                    expected: "'@' or identifier",
                    found,
                    position: first.position,
                })
            }
        };

        self.end_of_statement()?;
        Ok(Some(statement))
    }

    fn parameter(&mut self, position: Position) -> Result<Statement, ParseError> {
        let name = self.expect(TokenKind::Identifier, "parameter name")?;
        let value = self.value()?;
        Ok(Statement::Parameter {
            name: name.literal,
            value,
            position,
        })
    }

    fn connect(&mut self, variable: Token) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Colon, "':'")?;
        let port = self.expect(TokenKind::Identifier, "port name")?;
        self.expect(TokenKind::Arrow, "'->'")?;
        let to_variable = self.expect(TokenKind::Identifier, "variable name")?;
        self.expect(TokenKind::Colon, "':'")?;
        let to_port = self.expect(TokenKind::Identifier, "port name")?;

        Ok(Statement::Connect {
            from: Connector {
                variable: variable.literal,
                port: port.literal,
            },
            to: Connector {
                variable: to_variable.literal,
                port: to_port.literal,
            },
            position: variable.position,
        })
    }

    fn create(&mut self, variable: Token) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Equal, "'='")?;
        let type_name = self.expect(TokenKind::Identifier, "component type")?;
        self.expect(TokenKind::OpenParen, "'('")?;

        let mut arguments = Arguments::new();
        if self.peek_kind() == Some(TokenKind::CloseParen) {
            self.advance()?;
        } else {
            loop {
                let name = self.expect(TokenKind::Identifier, "argument name")?;
                self.expect(TokenKind::Equal, "'='")?;
                let value = self.value()?;
                if arguments.insert(name.literal.clone(), value).is_err() {
                    return Err(ParseError::DuplicateArgument {
                        name: name.literal,
                        position: name.position,
                    });
                }

                match self.peek_kind() {
                    Some(TokenKind::Comma) => {
                        self.advance()?;
                    }
                    Some(TokenKind::CloseParen) => {
                        self.advance()?;
                        break;
                    }
                    _ => return Err(self.unexpected("',' or ')'")),
                }
            }
        }

        Ok(Statement::CreateComponent {
            variable: variable.literal,
            type_name: type_name.literal,
            arguments,
            position: variable.position,
        })
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Identifier | TokenKind::Number | TokenKind::String) => {
                match self.advance()? {
                    Some(token) => token.to_value(),
                    None => Err(self.unexpected("value")),
                }
            }
            _ => Err(self.unexpected("value")),
        }
    }

    fn end_of_statement(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            None if self.tokens.peek().is_none() => Ok(()),
            Some(TokenKind::Newline) => {
                self.advance()?;
                Ok(())
            }
            _ => Err(self.unexpected("end of line")),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        if self.peek_kind() == Some(kind) {
            if let Some(token) = self.advance()? {
                return Ok(token);
            }
        }
        Err(self.unexpected(expected))
    }

    /// Consume the next token and describe why it does not fit
    fn unexpected(&mut self, expected: &'static str) -> ParseError {
        match self.advance() {
            Ok(Some(token)) => ParseError::UnexpectedToken {
                expected,
                found: token.kind,
                position: token.position,
            },
            Ok(None) => ParseError::UnexpectedEnd {
                expected,
                position: self.last,
            },
            Err(err) => err,
        }
    }

    /// Kind of the next token; `None` at end of input or before a lexical error
    fn peek_kind(&mut self) -> Option<TokenKind> {
        match self.tokens.peek() {
            Some(Ok(token)) => Some(token.kind),
            _ => None,
        }
    }

    fn advance(&mut self) -> Result<Option<Token>, ParseError> {
        match self.tokens.next() {
            None => Ok(None),
            Some(Ok(token)) => {
                self.last = token.position;
                Ok(Some(token))
            }
            Some(Err(err)) => Err(err.into()),
        }
    }
}

impl<I> Iterator for Parser<I>
where
    I: Iterator<Item = Result<Token, LexError>>,
{
    type Item = Result<Statement, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.parse_statement() {
            Ok(statement) => statement.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
