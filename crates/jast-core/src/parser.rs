//! Parser: builds a [`Tree`] from a stream of [`Token`]s.
//!
//! The parser is an explicit three-state machine:
//!
//! - **expect value**: scalars fill the current node; `[` and `{` turn it into
//!   a container holding one placeholder member and descend into that member
//! - **expect object key**: a string binds the key of the current object
//!   member and must be followed by `:`
//! - **expect delimiter**: `,` appends a new placeholder to the enclosing
//!   container, a matching closing bracket pops back to it
//!
//! # Key design decisions
//!
//! - **Placeholders**: every member exists as a `Kind::Error` node before its
//!   value is read. This lets an error report the key of the member being
//!   built, and leaves a partial tree that is still well formed.
//! - **Empty containers**: `[]` and `{}` are recognised when the closing
//!   bracket arrives while the only member is the fresh placeholder, which is
//!   then discarded.
//! - **Cancellation**: whatever the result, the token source is cancelled
//!   before the parser returns, so a threaded lexer never outlives a parse.

use std::io::Read;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Expected, JastError, ParseError, Result};
use crate::lexer::Lexer;
use crate::producer::LexerTask;
use crate::token::{Token, TokenKind};
use crate::tree::{Kind, NodeId, Payload, Tree};

/// Deepest container nesting the parser accepts. Opening one more array or
/// object fails with [`Expected::Scalar`].
pub const MAX_DEPTH: usize = 128;

/// A token stream the parser can stop early.
pub trait TokenSource: Iterator<Item = Token> {
    /// Stop producing tokens and release any resources. Must be idempotent.
    fn cancel(&mut self);
}

impl TokenSource for Lexer<'_> {
    fn cancel(&mut self) {
        self.stop();
    }
}

impl TokenSource for LexerTask {
    fn cancel(&mut self) {
        LexerTask::cancel(self);
    }
}

/// Result of a parse that keeps the partially built tree on failure.
///
/// Members that were never completed appear as `Kind::Error` nodes.
#[derive(Debug)]
pub struct ParseOutcome {
    pub tree: Tree,
    pub error: Option<ParseError>,
}

impl ParseOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Tree> {
        match self.error {
            Some(err) => Err(JastError::Parse(err)),
            None => Ok(self.tree),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectValue,
    ExpectObjectKey,
    ExpectDelimiter,
}

enum Step {
    Continue,
    Finished,
}

struct Parser<S> {
    source: S,
    tree: Tree,
    current: NodeId,
    state: State,
    /// Containers opened and not yet closed.
    depth: usize,
    /// Most recently consumed token.
    last: Option<Token>,
    /// Token consumed just before `last`.
    before: Option<Token>,
}

impl<S: TokenSource> Parser<S> {
    fn new(source: S) -> Self {
        let tree = Tree::placeholder();
        let current = tree.root_id();
        Self {
            source,
            tree,
            current,
            state: State::ExpectValue,
            depth: 0,
            last: None,
            before: None,
        }
    }

    fn run(mut self) -> ParseOutcome {
        let result = self.drive();
        self.source.cancel();
        match &result {
            Ok(()) => debug!(nodes = self.tree.node_count(), "parse finished"),
            Err(err) => debug!(error = %err, "parse failed"),
        }
        ParseOutcome {
            tree: self.tree,
            error: result.err(),
        }
    }

    fn drive(&mut self) -> std::result::Result<(), ParseError> {
        loop {
            let token = self.advance();
            let step = match self.state {
                State::ExpectValue => self.expect_value(token)?,
                State::ExpectObjectKey => self.expect_object_key(token)?,
                State::ExpectDelimiter => self.expect_delimiter(token)?,
            };
            if let Step::Finished = step {
                return Ok(());
            }
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.source.next();
        if let Some(t) = &token {
            self.before = self.last.replace(t.clone());
        }
        token
    }

    fn parent(&self) -> Option<NodeId> {
        self.tree.parent_id(self.current)
    }

    fn error(&self, expected: Expected, token: Option<Token>) -> ParseError {
        let before = match token {
            Some(_) => self.before.clone(),
            None => self.last.clone(),
        };
        ParseError {
            expected,
            token,
            before,
            parent: self.parent().map(|p| self.tree.kind_of(p)),
            key: self.tree.key_of(self.current),
        }
    }

    fn expect_value(&mut self, token: Option<Token>) -> std::result::Result<Step, ParseError> {
        let Some(token) = token else {
            return Err(self.error(Expected::Value, None));
        };
        let payload = match token.kind {
            TokenKind::Null => Payload::Null,
            TokenKind::True => Payload::Bool(true),
            TokenKind::False => Payload::Bool(false),
            TokenKind::Number => match parse_number(&token.text) {
                Some(n) => Payload::Number(n),
                None => return Err(self.error(Expected::Number, Some(token))),
            },
            TokenKind::String => Payload::String(token.text),
            TokenKind::ArrayOpen | TokenKind::ObjectOpen if self.depth == MAX_DEPTH => {
                return Err(self.error(Expected::Scalar, Some(token)));
            }
            TokenKind::ArrayOpen => {
                self.depth += 1;
                let child = self.tree.alloc(Payload::Error, Some(self.current));
                self.tree.set_payload(self.current, Payload::Array(vec![child]));
                self.current = child;
                return Ok(Step::Continue);
            }
            TokenKind::ObjectOpen => {
                self.depth += 1;
                let child = self.tree.alloc(Payload::Error, Some(self.current));
                self.tree
                    .set_payload(self.current, Payload::Object(vec![(String::new(), child)]));
                self.current = child;
                self.state = State::ExpectObjectKey;
                return Ok(Step::Continue);
            }
            TokenKind::ArrayClose if self.holds_only_placeholder(Kind::Array) => {
                self.close_empty();
                return Ok(Step::Continue);
            }
            _ => return Err(self.error(Expected::Value, Some(token))),
        };
        self.tree.set_payload(self.current, payload);
        self.state = State::ExpectDelimiter;
        Ok(Step::Continue)
    }

    fn expect_object_key(&mut self, token: Option<Token>) -> std::result::Result<Step, ParseError> {
        let Some(token) = token else {
            return Err(self.error(Expected::ObjectKey, None));
        };
        match token.kind {
            TokenKind::String => {
                if self.sibling_has_key(&token.text) {
                    return Err(self.error(Expected::UniqueKey, Some(token)));
                }
                self.bind_key(token.text);
                match self.advance() {
                    Some(t) if t.kind == TokenKind::Colon => {
                        self.state = State::ExpectValue;
                        Ok(Step::Continue)
                    }
                    other => Err(self.error(Expected::Colon, other)),
                }
            }
            TokenKind::ObjectClose if self.holds_only_placeholder(Kind::Object) => {
                self.close_empty();
                Ok(Step::Continue)
            }
            _ => Err(self.error(Expected::ObjectKey, Some(token))),
        }
    }

    fn expect_delimiter(&mut self, token: Option<Token>) -> std::result::Result<Step, ParseError> {
        let parent = self.parent();
        let parent_kind = parent.map(|p| self.tree.kind_of(p));

        let Some(token) = token else {
            return match parent {
                None => Ok(Step::Finished),
                Some(_) => Err(self.error(Expected::Delimiter, None)),
            };
        };
        let Some(parent) = parent else {
            return Err(self.error(Expected::Delimiter, Some(token)));
        };

        match (token.kind, parent_kind) {
            (TokenKind::Comma, _) => {
                let child = self.tree.alloc(Payload::Error, Some(parent));
                match self.tree.payload_mut(parent) {
                    Payload::Array(ids) => {
                        ids.push(child);
                        self.state = State::ExpectValue;
                    }
                    Payload::Object(entries) => {
                        entries.push((String::new(), child));
                        self.state = State::ExpectObjectKey;
                    }
                    _ => {}
                }
                self.current = child;
                Ok(Step::Continue)
            }
            (TokenKind::ArrayClose, Some(Kind::Array))
            | (TokenKind::ObjectClose, Some(Kind::Object)) => {
                self.current = parent;
                self.depth -= 1;
                Ok(Step::Continue)
            }
            (TokenKind::ObjectClose, Some(Kind::Array)) => {
                Err(self.error(Expected::ArrayClosing, Some(token)))
            }
            (TokenKind::ArrayClose | TokenKind::ObjectClose, _) => {
                Err(self.error(Expected::ObjectClosing, Some(token)))
            }
            _ => Err(self.error(Expected::Delimiter, Some(token))),
        }
    }

    /// Whether the enclosing container is a `kind` whose only member is the
    /// current placeholder, i.e. the container was opened by the last token.
    fn holds_only_placeholder(&self, kind: Kind) -> bool {
        let Some(parent) = self.parent() else {
            return false;
        };
        match (kind, self.tree.payload(parent)) {
            (Kind::Array, Payload::Array(ids)) => ids.as_slice() == [self.current],
            (Kind::Object, Payload::Object(entries)) => {
                entries.len() == 1 && entries[0].1 == self.current
            }
            _ => false,
        }
    }

    /// Drop the placeholder of a just-opened container and pop to it.
    fn close_empty(&mut self) {
        let Some(parent) = self.parent() else {
            return;
        };
        match self.tree.payload_mut(parent) {
            Payload::Array(ids) => ids.clear(),
            Payload::Object(entries) => entries.clear(),
            _ => {}
        }
        self.tree.release(self.current);
        self.current = parent;
        self.depth -= 1;
        self.state = State::ExpectDelimiter;
    }

    fn sibling_has_key(&self, key: &str) -> bool {
        let Some(parent) = self.parent() else {
            return false;
        };
        match self.tree.payload(parent) {
            Payload::Object(entries) => entries
                .iter()
                .any(|(k, id)| *id != self.current && k == key),
            _ => false,
        }
    }

    fn bind_key(&mut self, key: String) {
        let Some(parent) = self.parent() else {
            return;
        };
        let current = self.current;
        if let Payload::Object(entries) = self.tree.payload_mut(parent) {
            if let Some(entry) = entries.iter_mut().find(|(_, id)| *id == current) {
                entry.0 = key;
            }
        }
    }
}

/// Check `text` against the JSON number grammar
/// `-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?` and convert it.
/// Values that overflow to infinity are rejected.
fn parse_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut i = 0;
    let digits = |i: &mut usize| {
        let start = *i;
        while bytes.get(*i).is_some_and(u8::is_ascii_digit) {
            *i += 1;
        }
        *i - start
    };

    if bytes.first() == Some(&b'-') {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            digits(&mut i);
        }
        _ => return None,
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        if digits(&mut i) == 0 {
            return None;
        }
    }
    if let Some(b'e' | b'E') = bytes.get(i) {
        i += 1;
        if let Some(b'+' | b'-') = bytes.get(i) {
            i += 1;
        }
        if digits(&mut i) == 0 {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

// ============================================================================
// Entry points
// ============================================================================

/// Parse tokens from any source, keeping the partial tree on failure.
pub fn parse_from<S: TokenSource>(source: S) -> ParseOutcome {
    Parser::new(source).run()
}

/// Parse a string, keeping the partial tree on failure.
pub fn parse_partial(input: &str) -> ParseOutcome {
    debug!(bytes = input.len(), "parsing");
    parse_from(Lexer::new(input))
}

/// Parse a JSON document from a string.
///
/// ```rust
/// let tree = jast_core::parse_str(r#"{"a": [true, null]}"#).unwrap();
/// assert_eq!(tree.get("a.0").and_then(|n| n.as_bool()), Some(true));
/// ```
pub fn parse_str(input: &str) -> Result<Tree> {
    parse_partial(input).into_result()
}

/// Parse a JSON document from UTF-8 bytes.
pub fn parse_bytes(input: &[u8]) -> Result<Tree> {
    parse_str(std::str::from_utf8(input)?)
}

/// Read `reader` to the end and parse what it produced.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<Tree> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    parse_bytes(&buf)
}

/// Parse with the lexer running on its own thread, connected to the parser
/// by a single-slot channel.
pub fn parse_concurrent(input: String) -> Result<Tree> {
    debug!(bytes = input.len(), "parsing with lexer thread");
    let task = LexerTask::spawn(input)?;
    parse_from(task).into_result()
}

/// Whether `input` is one well-formed JSON document.
pub fn is_valid(input: &[u8]) -> bool {
    parse_bytes(input).is_ok()
}

impl FromStr for Tree {
    type Err = JastError;

    fn from_str(s: &str) -> Result<Self> {
        parse_str(s)
    }
}
