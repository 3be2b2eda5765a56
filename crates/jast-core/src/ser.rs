//! `serde::Serializer` that writes a native value straight into a tree.
//!
//! Every serializer targets one slot of the arena. Compound values allocate a
//! placeholder slot per member and hand it to a fresh serializer, so no
//! intermediate value is built.

use serde::ser::{self, Impossible, Serialize};

use crate::error::{JastError, Result};
use crate::tree::{NodeId, Payload, Tree};

pub(crate) struct NodeSerializer<'t> {
    tree: &'t mut Tree,
    slot: NodeId,
}

impl<'t> NodeSerializer<'t> {
    pub(crate) fn new(tree: &'t mut Tree, slot: NodeId) -> Self {
        Self { tree, slot }
    }

    fn leaf(self, payload: Payload) -> Result<()> {
        self.tree.set_payload(self.slot, payload);
        Ok(())
    }

    /// Turn the slot into `{variant: <placeholder>}` and return the placeholder.
    fn variant_slot(&mut self, variant: &str) -> NodeId {
        let child = self.tree.alloc(Payload::Error, Some(self.slot));
        self.tree
            .set_payload(self.slot, Payload::Object(vec![(variant.to_string(), child)]));
        child
    }
}

impl<'t> ser::Serializer for NodeSerializer<'t> {
    type Ok = ();
    type Error = JastError;

    type SerializeSeq = SeqBuilder<'t>;
    type SerializeTuple = SeqBuilder<'t>;
    type SerializeTupleStruct = SeqBuilder<'t>;
    type SerializeTupleVariant = SeqBuilder<'t>;
    type SerializeMap = MapBuilder<'t>;
    type SerializeStruct = MapBuilder<'t>;
    type SerializeStructVariant = MapBuilder<'t>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.leaf(Payload::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.serialize_f64(v as f64)
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.serialize_f64(v as f64)
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        if !v.is_finite() {
            return Err(JastError::Conversion(format!(
                "{v} cannot be represented as a JSON number"
            )));
        }
        self.leaf(Payload::Number(v))
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.leaf(Payload::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.leaf(Payload::String(v.to_string()))
    }

    /// Bytes become a string leaf, not an array of numbers.
    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.leaf(Payload::String(String::from_utf8_lossy(v).into_owned()))
    }

    fn serialize_none(self) -> Result<()> {
        self.leaf(Payload::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.leaf(Payload::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.leaf(Payload::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        mut self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        let child = self.variant_slot(variant);
        value.serialize(NodeSerializer::new(self.tree, child))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder<'t>> {
        Ok(SeqBuilder::new(self.tree, self.slot, len.unwrap_or(0)))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder<'t>> {
        Ok(SeqBuilder::new(self.tree, self.slot, len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqBuilder<'t>> {
        Ok(SeqBuilder::new(self.tree, self.slot, len))
    }

    fn serialize_tuple_variant(
        mut self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SeqBuilder<'t>> {
        let child = self.variant_slot(variant);
        Ok(SeqBuilder::new(self.tree, child, len))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapBuilder<'t>> {
        Ok(MapBuilder::new(self.tree, self.slot, len.unwrap_or(0)))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapBuilder<'t>> {
        Ok(MapBuilder::new(self.tree, self.slot, len))
    }

    fn serialize_struct_variant(
        mut self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<MapBuilder<'t>> {
        let child = self.variant_slot(variant);
        Ok(MapBuilder::new(self.tree, child, len))
    }
}

pub(crate) struct SeqBuilder<'t> {
    tree: &'t mut Tree,
    slot: NodeId,
}

impl<'t> SeqBuilder<'t> {
    fn new(tree: &'t mut Tree, slot: NodeId, len: usize) -> Self {
        tree.set_payload(slot, Payload::Array(Vec::with_capacity(len)));
        Self { tree, slot }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let child = self.tree.alloc(Payload::Error, Some(self.slot));
        if let Payload::Array(ids) = self.tree.payload_mut(self.slot) {
            ids.push(child);
        }
        value.serialize(NodeSerializer::new(self.tree, child))
    }
}

impl ser::SerializeSeq for SeqBuilder<'_> {
    type Ok = ();
    type Error = JastError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl ser::SerializeTuple for SeqBuilder<'_> {
    type Ok = ();
    type Error = JastError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for SeqBuilder<'_> {
    type Ok = ();
    type Error = JastError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for SeqBuilder<'_> {
    type Ok = ();
    type Error = JastError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

pub(crate) struct MapBuilder<'t> {
    tree: &'t mut Tree,
    slot: NodeId,
    pending_key: Option<String>,
}

impl<'t> MapBuilder<'t> {
    fn new(tree: &'t mut Tree, slot: NodeId, len: usize) -> Self {
        tree.set_payload(slot, Payload::Object(Vec::with_capacity(len)));
        Self {
            tree,
            slot,
            pending_key: None,
        }
    }

    fn insert<T: ?Sized + Serialize>(&mut self, key: String, value: &T) -> Result<()> {
        if let Payload::Object(entries) = self.tree.payload(self.slot) {
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(JastError::Conversion(format!("duplicate map key {key:?}")));
            }
        }
        let child = self.tree.alloc(Payload::Error, Some(self.slot));
        if let Payload::Object(entries) = self.tree.payload_mut(self.slot) {
            entries.push((key, child));
        }
        value.serialize(NodeSerializer::new(self.tree, child))
    }
}

impl ser::SerializeMap for MapBuilder<'_> {
    type Ok = ();
    type Error = JastError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        self.pending_key = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| JastError::Conversion("map value without a key".to_string()))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl ser::SerializeStruct for MapBuilder<'_> {
    type Ok = ();
    type Error = JastError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for MapBuilder<'_> {
    type Ok = ();
    type Error = JastError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// Object keys must be text. Integers, chars and bools are accepted in their
/// display form.
struct MapKeySerializer;

fn key_must_be_a_string() -> JastError {
    JastError::Conversion("map key must be a string".to_string())
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = JastError;

    type SerializeSeq = Impossible<String, JastError>;
    type SerializeTuple = Impossible<String, JastError>;
    type SerializeTupleStruct = Impossible<String, JastError>;
    type SerializeTupleVariant = Impossible<String, JastError>;
    type SerializeMap = Impossible<String, JastError>;
    type SerializeStruct = Impossible<String, JastError>;
    type SerializeStructVariant = Impossible<String, JastError>;

    fn serialize_bool(self, v: bool) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, _v: f32) -> Result<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_f64(self, _v: f64) -> Result<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_char(self, v: char) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_none(self) -> Result<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_unit(self) -> Result<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String> {
        Err(key_must_be_a_string())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(key_must_be_a_string())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(key_must_be_a_string())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(key_must_be_a_string())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(key_must_be_a_string())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(key_must_be_a_string())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(key_must_be_a_string())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(key_must_be_a_string())
    }
}
