//! Lexical tokens passed from the lexer to the parser.

use std::fmt;

/// Location of a token's first character. Rows advance on line feed, columns
/// count code points and reset on line feed or carriage return. Both start at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// Why the lexer gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Input ended inside a string body.
    UnterminatedString,
    /// Unknown escape character, bad `\uXXXX` digits or an unpaired surrogate.
    InvalidEscape,
    /// A run of characters that is not `null`, `true`, `false`, a number or a string.
    UnknownLiteral,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LexErrorKind::UnterminatedString => "unterminated string",
            LexErrorKind::InvalidEscape => "invalid escape sequence",
            LexErrorKind::UnknownLiteral => "unrecognized literal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Null,
    True,
    False,
    Number,
    String,
    Comma,
    Colon,
    ArrayOpen,
    ArrayClose,
    ObjectOpen,
    ObjectClose,
    Error(LexErrorKind),
}

/// A lexical unit with its source position.
///
/// `text` holds the raw digits for numbers, the decoded contents for strings
/// and the partial source run for errors. It is empty for everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position) -> Self {
        Self {
            kind,
            text: String::new(),
            position,
        }
    }

    pub fn with_text(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// Single-character structural tokens: `{ } [ ] , :`
    pub(crate) fn punctuation(c: char, position: Position) -> Option<Self> {
        let kind = match c {
            '{' => TokenKind::ObjectOpen,
            '}' => TokenKind::ObjectClose,
            '[' => TokenKind::ArrayOpen,
            ']' => TokenKind::ArrayClose,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            _ => return None,
        };
        Some(Self::new(kind, position))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TokenKind::Error(_))
    }

    /// Position-prefixed form used in error messages: `0:6 'nul'` for lexer
    /// errors, `0:4 <:>` otherwise.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Error(_) => format!("{} '{}'", self.position, self.text),
            _ => format!("{} {}", self.position, self),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Null => f.write_str("<null>"),
            TokenKind::True => f.write_str("<true>"),
            TokenKind::False => f.write_str("<false>"),
            TokenKind::Number => write!(f, "<num {}>", self.text),
            TokenKind::String => write!(f, "<str {:?}>", self.text),
            TokenKind::Comma => f.write_str("<,>"),
            TokenKind::Colon => f.write_str("<:>"),
            TokenKind::ArrayOpen => f.write_str("<[>"),
            TokenKind::ArrayClose => f.write_str("<]>"),
            TokenKind::ObjectOpen => f.write_str("<{>"),
            TokenKind::ObjectClose => f.write_str("<}>"),
            TokenKind::Error(kind) => write!(f, "<err {}: {}>", kind, self.text),
        }
    }
}
