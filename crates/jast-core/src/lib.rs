//! # jast-core
//!
//! JSON text to a mutable, path-addressable syntax tree and back.
//!
//! A document is parsed into a [`Tree`]: an arena of nodes, each knowing its
//! parent, addressable by dotted paths such as `"servlet.1.init-param"`.
//! Trees can be queried, edited in place, written out in several layouts and
//! converted to and from native Rust values through serde.
//!
//! ## Quick start
//!
//! ```rust
//! use jast_core::{parse_str, Member, Tree};
//!
//! let mut tree = parse_str(r#"{"a": 20, "b": [true, null]}"#).unwrap();
//! assert_eq!(tree.get("b.0").unwrap().key(), "b.0");
//!
//! tree.add_children([Member::standalone("c", "\"new\"").unwrap()]).unwrap();
//! tree.set_child("a", Tree::number(21.0)).unwrap();
//! tree.remove_child("b").unwrap();
//! assert_eq!(tree.to_string(), r#"{"a":21,"c":"new"}"#);
//! ```
//!
//! ## Modules
//!
//! - [`token`]: tokens and source positions
//! - [`lexer`]: text → tokens, pull-based
//! - [`producer`]: the lexer on its own thread behind a one-token channel
//! - [`parser`]: tokens → [`Tree`], with contextual [`ParseError`]s
//! - [`tree`]: arena tree, read/write views, queries and mutations
//! - [`format`]: tree → text under a configurable [`Style`]
//! - [`convert`]: tree ⇄ native values via serde
//! - [`error`]: error types

pub mod convert;
mod de;
pub mod error;
pub mod format;
pub mod lexer;
pub mod parser;
pub mod producer;
mod ser;
pub mod token;
pub mod tree;

pub use convert::{
    bytes, from_node, from_slice, from_str, is_zero, stringify, to_string, to_tree, to_vec,
};
pub use error::{Expected, JastError, ParseError, Result};
pub use format::Style;
pub use lexer::{lex, Lexer};
pub use parser::{
    is_valid, parse_bytes, parse_concurrent, parse_from, parse_partial, parse_reader, parse_str,
    ParseOutcome, TokenSource, MAX_DEPTH,
};
pub use producer::LexerTask;
pub use token::{LexErrorKind, Position, Token, TokenKind};
pub use tree::{Kind, Member, Node, NodeId, NodeMut, Tree};
