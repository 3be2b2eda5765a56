//! Error types for parsing, tree mutation and native conversion.

use std::fmt;

use thiserror::Error;

use crate::token::Token;
use crate::tree::Kind;

/// Errors that can occur anywhere in jast-core.
#[derive(Error, Debug)]
pub enum JastError {
    /// The input was not valid JSON. Lexer failures also end up here: the
    /// offending token of the parse error is the lexer's error token.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A path did not resolve to an existing node.
    #[error("path not found: {path:?}")]
    PathNotFound { path: String },

    /// Children can only be added to arrays and objects.
    #[error("not an array or object: node is {kind}")]
    NotAContainer { kind: Kind },

    /// Object members must have a non-empty key.
    #[error("empty key for object member")]
    EmptyKey,

    /// Object keys must be unique among siblings.
    #[error("duplicate object key: {key:?}")]
    DuplicateKey { key: String },

    /// A standalone fragment must be a single scalar (or an empty container).
    #[error("standalone fragment must be a single value")]
    NotStandalone,

    /// Mismatch between a tree and a native Rust value.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Internal tree consistency check failed.
    #[error("tree invariant violated: {0}")]
    Invariant(String),

    /// Byte input was not UTF-8.
    #[error("invalid UTF-8 input: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout jast-core.
pub type Result<T> = std::result::Result<T, JastError>;

impl serde::ser::Error for JastError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        JastError::Conversion(msg.to_string())
    }
}

impl serde::de::Error for JastError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        JastError::Conversion(msg.to_string())
    }
}

/// What the parser was looking for when it hit the offending token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Value,
    ObjectKey,
    Colon,
    Delimiter,
    UniqueKey,
    ArrayClosing,
    ObjectClosing,
    Number,
    /// Only a scalar fits: the containers around it are already nested
    /// [`MAX_DEPTH`](crate::parser::MAX_DEPTH) deep.
    Scalar,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Expected::Value => "value",
            Expected::ObjectKey => "object key",
            Expected::Colon => "colon",
            Expected::Delimiter => "delimiter",
            Expected::UniqueKey => "unique key",
            Expected::ArrayClosing => "array closing",
            Expected::ObjectClosing => "object closing",
            Expected::Number => "number",
            Expected::Scalar => "scalar",
        };
        f.write_str(s)
    }
}

/// A grammar violation with the context needed to locate it.
///
/// - `token`: the offending token, `None` when input ended early
/// - `before`: the token consumed immediately before it
/// - `parent`: kind of the enclosing container, `None` at the root
/// - `key`: dotted path of the node under construction
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub expected: Expected,
    pub token: Option<Token>,
    pub before: Option<Token>,
    pub parent: Option<Kind>,
    pub key: String,
}

impl ParseError {
    /// `(row, col)` of the offending token, or of the last token seen when
    /// input ended early. Both are 0-based.
    pub fn position(&self) -> (usize, usize) {
        let pos = self
            .token
            .as_ref()
            .or(self.before.as_ref())
            .map(|t| t.position)
            .unwrap_or_default();
        (pos.row, pos.col)
    }

    /// Whether the offending token came out of the lexer as an error token.
    pub fn is_lex_error(&self) -> bool {
        self.token.as_ref().is_some_and(Token::is_error)
    }
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.token {
            Some(t) => write!(f, "{}", t.describe())?,
            None => {
                let at = self
                    .before
                    .as_ref()
                    .map(|t| t.position)
                    .unwrap_or_default();
                write!(f, "{at} end of input")?
            }
        }
        match &self.before {
            None => write!(f, "; expected {}", self.expected),
            Some(before) => {
                write!(f, "; expected {} token after {}", self.expected, before)?;
                match self.parent {
                    Some(parent) => write!(f, " (at {:?} in {})", self.key, parent),
                    None => Ok(()),
                }
            }
        }
    }
}
