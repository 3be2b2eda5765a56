//! `serde::Deserializer` reading a native value out of a tree node.
//!
//! Typed requests are strict: a node of the wrong kind is a conversion error
//! naming both kinds. Strings are handed out borrowed from the tree.

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeSeed, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

use crate::error::{JastError, Result};
use crate::tree::{Kind, Node, Payload};

pub(crate) struct NodeDeserializer<'de> {
    node: Node<'de>,
}

impl<'de> NodeDeserializer<'de> {
    pub(crate) fn new(node: Node<'de>) -> Self {
        Self { node }
    }

    fn mismatch(&self, want: &str) -> JastError {
        JastError::Conversion(format!(
            "mismatched type at {:?}: want {want} got {}",
            self.node.key(),
            self.node.kind()
        ))
    }

    fn number(&self, want: &str) -> Result<f64> {
        self.node.as_f64().ok_or_else(|| self.mismatch(want))
    }

    fn string(&self, want: &str) -> Result<&'de str> {
        self.node.as_str().ok_or_else(|| self.mismatch(want))
    }

    fn visit_array<V: Visitor<'de>>(&self, visitor: V) -> Result<V::Value> {
        if self.node.kind() != Kind::Array {
            return Err(self.mismatch("Array"));
        }
        let mut access = SeqAccess::new(self.node);
        let value = visitor.visit_seq(&mut access)?;
        match access.items.len() {
            0 => Ok(value),
            left => Err(JastError::Conversion(format!(
                "{left} trailing elements in the Array at {:?}",
                self.node.key()
            ))),
        }
    }

    fn visit_object<V: Visitor<'de>>(&self, visitor: V) -> Result<V::Value> {
        if self.node.kind() != Kind::Object {
            return Err(self.mismatch("Object"));
        }
        let mut access = MapAccess::new(self.node);
        let value = visitor.visit_map(&mut access)?;
        match access.entries.len() {
            0 => Ok(value),
            left => Err(JastError::Conversion(format!(
                "{left} trailing members in the Object at {:?}",
                self.node.key()
            ))),
        }
    }
}

/// Accept only integral numbers that fit the target type. `MAX + 1` is a
/// power of two and exact as an `f64`, unlike `MAX` for the 64-bit types.
macro_rules! deserialize_integer {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
            let n = self.number(stringify!($ty))?;
            let end = <$ty>::MAX as f64 + 1.0;
            if n.fract() != 0.0 || n < <$ty>::MIN as f64 || n >= end {
                return Err(JastError::Conversion(format!(
                    "number {n} at {:?} does not fit {}",
                    self.node.key(),
                    stringify!($ty)
                )));
            }
            visitor.$visit(n as $ty)
        }
    };
}

impl<'de> de::Deserializer<'de> for NodeDeserializer<'de> {
    type Error = JastError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.node.payload() {
            Payload::Error => Err(JastError::Conversion(format!(
                "unresolved node at {:?}",
                self.node.key()
            ))),
            Payload::Null => visitor.visit_unit(),
            Payload::Bool(b) => visitor.visit_bool(*b),
            Payload::Number(n) => visitor.visit_f64(*n),
            Payload::String(s) => visitor.visit_borrowed_str(s),
            Payload::Array(_) => self.visit_array(visitor),
            Payload::Object(_) => self.visit_object(visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.node.as_bool() {
            Some(b) => visitor.visit_bool(b),
            None => Err(self.mismatch("Bool")),
        }
    }

    deserialize_integer!(deserialize_i8, visit_i8, i8);
    deserialize_integer!(deserialize_i16, visit_i16, i16);
    deserialize_integer!(deserialize_i32, visit_i32, i32);
    deserialize_integer!(deserialize_i64, visit_i64, i64);
    deserialize_integer!(deserialize_u8, visit_u8, u8);
    deserialize_integer!(deserialize_u16, visit_u16, u16);
    deserialize_integer!(deserialize_u32, visit_u32, u32);
    deserialize_integer!(deserialize_u64, visit_u64, u64);

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f32(self.number("Number")? as f32)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f64(self.number("Number")?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let s = self.string("String")?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(JastError::Conversion(format!(
                "expected a single character at {:?}, got {s:?}",
                self.node.key()
            ))),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str(self.string("String")?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    /// Bytes are read from a string node.
    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_bytes(self.string("String")?.as_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.node.kind() {
            Kind::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.node.kind() {
            Kind::Null => visitor.visit_unit(),
            _ => Err(self.mismatch("Null")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.visit_array(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.visit_object(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_map(visitor)
    }

    /// Unit variants are strings; other variants are `{variant: payload}`.
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.node.payload() {
            Payload::String(s) => visitor.visit_enum(s.as_str().into_deserializer()),
            Payload::Object(entries) if entries.len() == 1 => {
                let mut members = self.node.children();
                match members.next() {
                    Some((Some(variant), value)) => visitor.visit_enum(EnumAccess { variant, value }),
                    _ => Err(self.mismatch("String or single-entry Object")),
                }
            }
            _ => Err(self.mismatch("String or single-entry Object")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }
}

struct SeqAccess<'de> {
    items: std::vec::IntoIter<Node<'de>>,
}

impl<'de> SeqAccess<'de> {
    fn new(node: Node<'de>) -> Self {
        let items: Vec<Node<'de>> = node.children().map(|(_, child)| child).collect();
        Self {
            items: items.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqAccess<'de> {
    type Error = JastError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.items.next() {
            Some(node) => seed.deserialize(NodeDeserializer::new(node)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct MapAccess<'de> {
    entries: std::vec::IntoIter<(&'de str, Node<'de>)>,
    value: Option<Node<'de>>,
}

impl<'de> MapAccess<'de> {
    fn new(node: Node<'de>) -> Self {
        let entries: Vec<(&'de str, Node<'de>)> = node
            .children()
            .map(|(key, child)| (key.unwrap_or_default(), child))
            .collect();
        Self {
            entries: entries.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapAccess<'de> {
    type Error = JastError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        match self.entries.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(KeyDeserializer(key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let value = self
            .value
            .take()
            .ok_or_else(|| JastError::Conversion("map value requested before its key".to_string()))?;
        seed.deserialize(NodeDeserializer::new(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct EnumAccess<'de> {
    variant: &'de str,
    value: Node<'de>,
}

impl<'de> de::EnumAccess<'de> for EnumAccess<'de> {
    type Error = JastError;
    type Variant = NodeDeserializer<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(BorrowedStrDeserializer::<JastError>::new(self.variant))?;
        Ok((variant, NodeDeserializer::new(self.value)))
    }
}

impl<'de> de::VariantAccess<'de> for NodeDeserializer<'de> {
    type Error = JastError;

    fn unit_variant(self) -> Result<()> {
        de::Deserialize::deserialize(self)
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        de::Deserializer::deserialize_map(self, visitor)
    }
}

/// Object keys, parsed on request for integer- and bool-keyed maps.
struct KeyDeserializer<'de>(&'de str);

macro_rules! deserialize_parsed_key {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
            let value: $ty = self.0.parse().map_err(|_| {
                JastError::Conversion(format!(
                    "map key {:?} is not a valid {}",
                    self.0,
                    stringify!($ty)
                ))
            })?;
            visitor.$visit(value)
        }
    };
}

impl<'de> de::Deserializer<'de> for KeyDeserializer<'de> {
    type Error = JastError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str(self.0)
    }

    deserialize_parsed_key!(deserialize_bool, visit_bool, bool);
    deserialize_parsed_key!(deserialize_i8, visit_i8, i8);
    deserialize_parsed_key!(deserialize_i16, visit_i16, i16);
    deserialize_parsed_key!(deserialize_i32, visit_i32, i32);
    deserialize_parsed_key!(deserialize_i64, visit_i64, i64);
    deserialize_parsed_key!(deserialize_u8, visit_u8, u8);
    deserialize_parsed_key!(deserialize_u16, visit_u16, u16);
    deserialize_parsed_key!(deserialize_u32, visit_u32, u32);
    deserialize_parsed_key!(deserialize_u64, visit_u64, u64);

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_enum(self.0.into_deserializer())
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        f32 f64 char str string bytes byte_buf option unit unit_struct seq
        tuple tuple_struct map struct identifier ignored_any
    }
}
