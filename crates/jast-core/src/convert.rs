//! Conversion between trees and native Rust values.
//!
//! Any `serde::Serialize` value can be turned into a [`Tree`], and any
//! `serde::Deserialize` value can be read back out of a [`Node`]. Per-field
//! behaviour is configured with ordinary serde attributes:
//!
//! | Behaviour                 | Attribute                                                      |
//! |---------------------------|----------------------------------------------------------------|
//! | rename                    | `#[serde(rename = "name")]`                                    |
//! | skip                      | `#[serde(skip)]`                                               |
//! | omit when zero            | `#[serde(default, skip_serializing_if = "jast_core::is_zero")]` |
//! | store as text             | `#[serde(with = "jast_core::stringify")]`                       |
//! | bytes as a string         | `#[serde(with = "jast_core::bytes")]`                           |
//!
//! [`Tree`] and [`Node`] are themselves `Serialize`, and `Tree` is
//! `Deserialize`, so a subtree can sit in a native record as an opaque field.
//!
//! # Example
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Server {
//!     #[serde(rename = "hostName")]
//!     host: String,
//!     #[serde(default, skip_serializing_if = "jast_core::is_zero")]
//!     port: u16,
//! }
//!
//! let text = jast_core::to_string(&Server { host: "mail1".into(), port: 0 }).unwrap();
//! assert_eq!(text, r#"{"hostName":"mail1"}"#);
//!
//! let back: Server = jast_core::from_str(&text).unwrap();
//! assert_eq!(back, Server { host: "mail1".into(), port: 0 });
//! ```

use serde::de::DeserializeOwned;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::de::NodeDeserializer;
use crate::error::Result;
use crate::format::Style;
use crate::parser::parse_bytes;
use crate::ser::NodeSerializer;
use crate::tree::{Node, Payload, Tree};

/// Integral numbers below this magnitude serialize as `i64`.
const EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

impl Serialize for Node<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.payload() {
            Payload::Error => Err(S::Error::custom(format!(
                "unresolved node at {:?}",
                self.key()
            ))),
            Payload::Null => serializer.serialize_unit(),
            Payload::Bool(b) => serializer.serialize_bool(*b),
            Payload::Number(n) if n.fract() == 0.0 && n.abs() < EXACT_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            Payload::Number(n) => serializer.serialize_f64(*n),
            Payload::String(s) => serializer.serialize_str(s),
            Payload::Array(_) => serializer.collect_seq(self.children().map(|(_, child)| child)),
            Payload::Object(_) => serializer.collect_map(
                self.children()
                    .map(|(key, child)| (key.unwrap_or_default(), child)),
            ),
        }
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root().serialize(serializer)
    }
}

/// Goes through `serde_json::Value`, so member order follows the source.
impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(|value| Tree::from_value(&value))
    }
}

/// Encode a native value as a tree.
pub fn to_tree<T: ?Sized + Serialize>(value: &T) -> Result<Tree> {
    let mut tree = Tree::placeholder();
    let root = tree.root_id();
    value.serialize(NodeSerializer::new(&mut tree, root))?;
    Ok(tree)
}

/// Decode a native value from a node. Strings may be borrowed from the tree.
pub fn from_node<'de, T: Deserialize<'de>>(node: Node<'de>) -> Result<T> {
    T::deserialize(NodeDeserializer::new(node))
}

/// Encode a native value as compact JSON bytes.
pub fn to_vec<T: ?Sized + Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(to_tree(value)?.to_vec(&Style::compact()))
}

/// Encode a native value as compact JSON text.
pub fn to_string<T: ?Sized + Serialize>(value: &T) -> Result<String> {
    Ok(to_tree(value)?.to_string())
}

/// Parse JSON bytes and decode a native value from them.
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let tree = parse_bytes(bytes)?;
    from_node(tree.root())
}

/// Parse JSON text and decode a native value from it.
pub fn from_str<T: DeserializeOwned>(text: &str) -> Result<T> {
    from_slice(text.as_bytes())
}

/// Whether `value` equals its type's default. Meant for
/// `skip_serializing_if`, to leave zero-valued fields out of the output.
pub fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Store a field as its text form.
///
/// Encoding writes the value's `Display` output as a string. Decoding accepts
/// a string, number, bool or null node, reduces it to text and parses it with
/// `FromStr`, so `5`, `"5"` and `true` all feed the field's parser.
pub mod stringify {
    use std::fmt::{self, Display};
    use std::str::FromStr;

    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;

    use crate::format::format_number;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let text = deserializer.deserialize_any(TextVisitor)?;
        text.parse().map_err(de::Error::custom)
    }

    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number, bool or null")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(format_number(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_unit<E: de::Error>(self) -> Result<String, E> {
            Ok("null".to_string())
        }

        fn visit_none<E: de::Error>(self) -> Result<String, E> {
            Ok("null".to_string())
        }
    }
}

/// Store a byte buffer as a string.
///
/// Encoding goes through `serialize_bytes`, which a tree holds as a string
/// leaf; invalid UTF-8 is replaced with U+FFFD. Decoding takes a string, or
/// an array of bytes from codecs that write one.
pub mod bytes {
    use std::fmt;

    use serde::de::{self, Deserializer, SeqAccess, Visitor};
    use serde::Serializer;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: ?Sized + AsRef<[u8]>,
        S: Serializer,
    {
        serializer.serialize_bytes(value.as_ref())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_byte_buf(BytesVisitor)
    }

    struct BytesVisitor;

    impl<'de> Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or byte array")
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Vec<u8>, E> {
            Ok(v.to_vec())
        }

        fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Vec<u8>, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Vec<u8>, E> {
            Ok(v.as_bytes().to_vec())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Vec<u8>, E> {
            Ok(v.into_bytes())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<u8>, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(byte) = seq.next_element()? {
                out.push(byte);
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_zero_matches_defaults() {
        assert!(is_zero(&0u32));
        assert!(is_zero(&String::new()));
        assert!(is_zero(&Vec::<u8>::new()));
        assert!(!is_zero(&1.5f64));
        assert!(!is_zero(&"x".to_string()));
    }
}
