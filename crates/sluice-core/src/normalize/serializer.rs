//! A `serde::Serializer` whose output is a [`Value`] tree.
//!
//! serde already follows references, boxes and smart pointers, so this
//! serializer only has to decide what each data-model item becomes.

use std::fmt::Display;

use serde::ser::{self, Serialize};
use thiserror::Error;

use super::Value;

/// Error raised by a value's own `Serialize` implementation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct NormalizeError(String);

impl ser::Error for NormalizeError
{
    fn custom<T: Display>(msg: T) -> Self
    {
        Self(msg.to_string())
    }
}

type Result<T> = std::result::Result<T, NormalizeError>;

/// Serializer producing a [`Value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueSerializer;

fn wide_int(value: i128) -> Value
{
    i64::try_from(value).map_or_else(|_| Value::Str(value.to_string()), Value::Int)
}

fn wide_uint(value: u128) -> Value
{
    u64::try_from(value).map_or_else(|_| Value::Str(value.to_string()), Value::UInt)
}

fn tagged(variant: &str, payload: Value) -> Value
{
    Value::Map(vec![(Value::Str(variant.to_string()), payload)])
}

impl ser::Serializer for ValueSerializer
{
    type Ok = Value;
    type Error = NormalizeError;

    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = SeqBuilder;
    type SerializeTupleVariant = SeqBuilder;
    type SerializeMap = MapBuilder;
    type SerializeStruct = MapBuilder;
    type SerializeStructVariant = MapBuilder;

    fn serialize_bool(self, v: bool) -> Result<Value>
    {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value>
    {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Value>
    {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Value>
    {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Value>
    {
        Ok(Value::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value>
    {
        Ok(wide_int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value>
    {
        Ok(Value::UInt(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Value>
    {
        Ok(Value::UInt(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Value>
    {
        Ok(Value::UInt(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Value>
    {
        Ok(Value::UInt(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Value>
    {
        Ok(wide_uint(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value>
    {
        Ok(Value::Float(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<Value>
    {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value>
    {
        Ok(Value::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value>
    {
        Ok(Value::Str(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value>
    {
        Ok(Value::Seq(v.iter().map(|b| Value::UInt((*b).into())).collect()))
    }

    fn serialize_none(self) -> Result<Value>
    {
        Ok(Value::Nil)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value>
    {
        Ok(Value::Nil)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Value>
    {
        Ok(Value::Str(name.to_string()))
    }

    fn serialize_unit_variant(self, _name: &'static str, _index: u32, variant: &'static str) -> Result<Value>
    {
        Ok(Value::Str(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        Ok(tagged(variant, value.serialize(self)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder>
    {
        Ok(SeqBuilder::new(None, len.unwrap_or(0)))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder>
    {
        Ok(SeqBuilder::new(None, len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqBuilder>
    {
        Ok(SeqBuilder::new(None, len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SeqBuilder>
    {
        Ok(SeqBuilder::new(Some(variant), len))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapBuilder>
    {
        Ok(MapBuilder::new(None, len.unwrap_or(0), true))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapBuilder>
    {
        Ok(MapBuilder::new(None, len, false))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<MapBuilder>
    {
        Ok(MapBuilder::new(Some(variant), len, false))
    }
}

/// Collects sequence, tuple and tuple-variant elements.
#[derive(Debug)]
pub struct SeqBuilder
{
    variant: Option<&'static str>,
    items: Vec<Value>,
}

impl SeqBuilder
{
    fn new(variant: Option<&'static str>, len: usize) -> Self
    {
        Self {
            variant,
            items: Vec::with_capacity(len),
        }
    }

    fn push<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn finish(self) -> Value
    {
        let seq = Value::Seq(self.items);
        match self.variant {
            Some(variant) => tagged(variant, seq),
            None => seq,
        }
    }
}

impl ser::SerializeSeq for SeqBuilder
{
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value>
    {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqBuilder
{
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value>
    {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqBuilder
{
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value>
    {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for SeqBuilder
{
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value>
    {
        Ok(self.finish())
    }
}

/// Collects map entries and struct fields.
///
/// Map entries are sorted by key on completion; struct fields keep their
/// declaration order. Fields a type skips never reach the builder.
#[derive(Debug)]
pub struct MapBuilder
{
    variant: Option<&'static str>,
    entries: Vec<(Value, Value)>,
    pending_key: Option<Value>,
    sort: bool,
}

impl MapBuilder
{
    fn new(variant: Option<&'static str>, len: usize, sort: bool) -> Self
    {
        Self {
            variant,
            entries: Vec::with_capacity(len),
            pending_key: None,
            sort,
        }
    }

    fn field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.entries.push((Value::Str(key.to_string()), value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn finish(mut self) -> Value
    {
        if self.sort {
            self.entries.sort_by(|a, b| a.0.total_cmp(&b.0));
        }
        let map = Value::Map(self.entries);
        match self.variant {
            Some(variant) => tagged(variant, map),
            None => map,
        }
    }
}

impl ser::SerializeMap for MapBuilder
{
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.pending_key = Some(key.serialize(ValueSerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| <NormalizeError as ser::Error>::custom("map value serialized before its key"))?;
        self.entries.push((key, value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<Value>
    {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for MapBuilder
{
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<Value>
    {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for MapBuilder
{
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<Value>
    {
        Ok(self.finish())
    }
}
