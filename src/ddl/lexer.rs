//! DDL Tokenizer
//!
//! Splits patch description text into tokens. Whitespace other than line feeds
//! separates tokens; a line feed is itself a token since it ends a statement.

use std::fmt;
use thiserror::Error;

/// 1-based location in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    At,
    OpenParen,
    CloseParen,
    Equal,
    Colon,
    Comma,
    Arrow,
    Identifier,
    Number,
    /// Double-quoted text; the literal excludes the quotes
    String,
    Newline,
}

impl TokenKind {
    fn from_symbol(c: char) -> Option<Self> {
        match c {
            '@' => Some(TokenKind::At),
            '(' => Some(TokenKind::OpenParen),
            ')' => Some(TokenKind::CloseParen),
            '=' => Some(TokenKind::Equal),
            ':' => Some(TokenKind::Colon),
            ',' => Some(TokenKind::Comma),
            '\n' => Some(TokenKind::Newline),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::At => "'@'",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::Equal => "'='",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::Arrow => "'->'",
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Newline => "end of line",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    /// Location of the first character
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            literal: literal.into(),
            position,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Identifier | TokenKind::Number | TokenKind::String => {
                write!(f, "{} '{}' at {}", self.kind, self.literal, self.position)
            }
            _ => write!(f, "{} at {}", self.kind, self.position),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("{position}: unexpected character {ch:?}")]
    UnexpectedCharacter { ch: char, position: Position },

    /// `position` points at the offending second '.'
    #[error("{position}: too many '.' in number '{literal}'")]
    MalformedNumber { literal: String, position: Position },

    #[error("{position}: unterminated string")]
    UnterminatedString { position: Position },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnexpectedCharacter { position, .. }
            | LexError::MalformedNumber { position, .. }
            | LexError::UnterminatedString { position } => *position,
        }
    }
}

/// Forward-only tokenizer over DDL source text.
///
/// Yields `Err` at most once; the sequence ends after a lexical error.
pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
            failed: false,
        }
    }

    /// Location of the next unread character
    pub fn current_position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Next token, or `Ok(None)` at end of input
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let start = self.current_position();
        let Some(c) = self.bump() else {
            return Ok(None);
        };

        if let Some(kind) = TokenKind::from_symbol(c) {
            return Ok(Some(Token::new(kind, c, start)));
        }

        let token = match c {
            '-' => match self.peek() {
                Some('>') => {
                    self.bump();
                    Token::new(TokenKind::Arrow, "->", start)
                }
                Some(d) if d.is_ascii_digit() => self.number(String::from("-"), start)?,
                _ => {
                    return Err(LexError::UnexpectedCharacter {
                        ch: '-',
                        position: start,
                    })
                }
            },
            '"' => self.string(start)?,
            c if c.is_ascii_digit() => self.number(c.to_string(), start)?,
            c if c.is_alphabetic() || c == '_' => self.identifier(c, start),
            ch => {
                return Err(LexError::UnexpectedCharacter {
                    ch,
                    position: start,
                })
            }
        };
        Ok(Some(token))
    }

    fn peek(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.source[self.offset..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' || !c.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    fn identifier(&mut self, first: char, start: Position) -> Token {
        let mut literal = String::from(first);
        while let Some(c) = self.peek() {
            let continues = match c {
                // "a->b" is an identifier followed by an arrow
                '-' => self.peek_second() != Some('>'),
                c => c.is_alphanumeric() || c == '_',
            };
            if !continues {
                break;
            }
            literal.push(c);
            self.bump();
        }
        Token::new(TokenKind::Identifier, literal, start)
    }

    fn number(&mut self, mut literal: String, start: Position) -> Result<Token, LexError> {
        while let Some(c) = self.peek() {
            if c == '.' {
                if literal.contains('.') {
                    return Err(LexError::MalformedNumber {
                        literal,
                        position: self.current_position(),
                    });
                }
            } else if !c.is_ascii_digit() {
                break;
            }
            literal.push(c);
            self.bump();
        }
        Ok(Token::new(TokenKind::Number, literal, start))
    }

    fn string(&mut self, start: Position) -> Result<Token, LexError> {
        let mut literal = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.bump();
                    return Ok(Token::new(TokenKind::String, literal, start));
                }
                Some('\n') | None => return Err(LexError::UnterminatedString { position: start }),
                Some(c) => {
                    literal.push(c);
                    self.bump();
                }
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
