//! Serializer: writes a tree back out as JSON text.
//!
//! One recursive writer handles every output shape. A [`Style`] supplies four
//! strings that are inserted at fixed points:
//!
//! - `indent`: repeated once per nesting level before each member
//! - `after_value`: after an opening bracket, between members and before a
//!   closing bracket
//! - `after_comma`: after the `,` separating members
//! - `after_colon`: after the `:` of an object member
//!
//! Empty arrays and objects are always written as `[]` and `{}`.
//!
//! # Example
//! ```
//! use jast_core::{parse_str, Style};
//! let tree = parse_str(r#"{"a": 20, "b": [true, null]}"#).unwrap();
//! assert_eq!(tree.to_string(), r#"{"a":20,"b":[true,null]}"#);
//! assert_eq!(
//!     tree.root().to_string_styled(&Style::debug()),
//!     r#"{~!"a":^20,-~!"b":^[~!!true,-~!!null~!]~}"#
//! );
//! ```

use std::fmt;
use std::io::Write;

use crate::error::Result;
use crate::tree::{Node, Payload, Tree};

/// Separator strings for [`Node::to_string_styled`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Style {
    pub indent: String,
    pub after_value: String,
    pub after_comma: String,
    pub after_colon: String,
}

impl Style {
    pub fn new(
        indent: impl Into<String>,
        after_value: impl Into<String>,
        after_comma: impl Into<String>,
        after_colon: impl Into<String>,
    ) -> Self {
        Self {
            indent: indent.into(),
            after_value: after_value.into(),
            after_comma: after_comma.into(),
            after_colon: after_colon.into(),
        }
    }

    /// No whitespace at all. Compact output is canonical: parsing compact
    /// text and writing it compact again reproduces it exactly.
    pub fn compact() -> Self {
        Self::default()
    }

    /// One member per line, `indent` repeated per level, a space after `:`.
    pub fn indented(indent: impl Into<String>) -> Self {
        Self::new(indent, "\n", "", " ")
    }

    /// Single line with a space after `,` and `:`.
    pub fn spaced() -> Self {
        Self::new("", "", " ", " ")
    }

    /// Visible markers in place of whitespace, for inspecting the layout.
    pub fn debug() -> Self {
        Self::new("!", "~", "-", "^")
    }
}

impl<'a> Node<'a> {
    /// Append the text of this node to `out`.
    pub fn format_into(&self, out: &mut String, style: &Style) {
        write_node(*self, style, 0, out);
    }

    pub fn to_string_styled(&self, style: &Style) -> String {
        let mut out = String::new();
        self.format_into(&mut out, style);
        out
    }

    pub fn to_indented_string(&self, indent: &str) -> String {
        self.to_string_styled(&Style::indented(indent))
    }

    pub fn to_debug_string(&self) -> String {
        self.to_string_styled(&Style::debug())
    }

    pub fn to_vec(&self, style: &Style) -> Vec<u8> {
        self.to_string_styled(style).into_bytes()
    }

    /// Write the text of this node to `writer`, returning the byte count.
    pub fn write_json<W: Write>(&self, mut writer: W, style: &Style) -> Result<usize> {
        let text = self.to_string_styled(style);
        writer.write_all(text.as_bytes())?;
        Ok(text.len())
    }
}

impl Tree {
    pub fn to_string_styled(&self, style: &Style) -> String {
        self.root().to_string_styled(style)
    }

    pub fn to_indented_string(&self, indent: &str) -> String {
        self.root().to_indented_string(indent)
    }

    pub fn to_vec(&self, style: &Style) -> Vec<u8> {
        self.root().to_vec(style)
    }

    pub fn write_json<W: Write>(&self, writer: W, style: &Style) -> Result<usize> {
        self.root().write_json(writer, style)
    }
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_styled(&Style::compact()))
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root(), f)
    }
}

fn write_node(node: Node<'_>, style: &Style, level: usize, out: &mut String) {
    let (open, close) = match node.payload() {
        Payload::Error => return out.push_str("<error>"),
        Payload::Null => return out.push_str("null"),
        Payload::Bool(b) => return out.push_str(if *b { "true" } else { "false" }),
        Payload::Number(n) => return out.push_str(&format_number(*n)),
        Payload::String(s) => return write_string(s, out),
        Payload::Array(ids) if ids.is_empty() => return out.push_str("[]"),
        Payload::Object(entries) if entries.is_empty() => return out.push_str("{}"),
        Payload::Array(_) => ('[', ']'),
        Payload::Object(_) => ('{', '}'),
    };

    out.push(open);
    out.push_str(&style.after_value);
    for (i, (key, child)) in node.children().enumerate() {
        if i > 0 {
            out.push(',');
            out.push_str(&style.after_comma);
            out.push_str(&style.after_value);
        }
        push_indent(&style.indent, level + 1, out);
        if let Some(key) = key {
            write_string(key, out);
            out.push(':');
            out.push_str(&style.after_colon);
        }
        write_node(child, style, level + 1, out);
    }
    out.push_str(&style.after_value);
    push_indent(&style.indent, level, out);
    out.push(close);
}

fn push_indent(indent: &str, level: usize, out: &mut String) {
    for _ in 0..level {
        out.push_str(indent);
    }
}

/// Shortest text that reads back as the same `f64`. Non-finite values have
/// no JSON form and are written as `null`; `-0` is written as `0`.
///
/// Decimal exponents below -4 or from 21 up switch to exponent form with a
/// signed, two-digit minimum exponent: `1e+21`, `2.5e-07`.
pub(crate) fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return "null".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let scientific = format!("{:e}", n);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return format!("{}", n);
    };
    match exponent.parse::<i32>() {
        Ok(exp) if exp < -4 || exp >= 21 => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
        }
        _ => format!("{}", n),
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}
