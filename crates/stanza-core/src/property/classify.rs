//! Serializer that maps a value straight onto a scalar property kind.
//!
//! Only primitive shapes are accepted; anything compound stops with
//! [`Classify::Compound`] so the caller can fall back to an opaque payload.

use std::fmt;

use bytes::Bytes;
use serde::ser::{self, Impossible, Serialize, Serializer};

use super::PropertyValue;

#[derive(Debug, thiserror::Error)]
pub(super) enum Classify {
    #[error("value is not a scalar")]
    Compound,
    #[error("null is not a property value")]
    Null,
    #[error("{0}")]
    Custom(String),
}

impl ser::Error for Classify {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Classify::Custom(msg.to_string())
    }
}

type Out = std::result::Result<PropertyValue, Classify>;

fn small(v: i64) -> PropertyValue {
    match i32::try_from(v) {
        Ok(v) => PropertyValue::Int(v),
        Err(_) => PropertyValue::Long(v),
    }
}

pub(super) struct ScalarSerializer;

impl Serializer for ScalarSerializer {
    type Ok = PropertyValue;
    type Error = Classify;
    type SerializeSeq = Impossible<PropertyValue, Classify>;
    type SerializeTuple = Impossible<PropertyValue, Classify>;
    type SerializeTupleStruct = Impossible<PropertyValue, Classify>;
    type SerializeTupleVariant = Impossible<PropertyValue, Classify>;
    type SerializeMap = Impossible<PropertyValue, Classify>;
    type SerializeStruct = Impossible<PropertyValue, Classify>;
    type SerializeStructVariant = Impossible<PropertyValue, Classify>;

    fn serialize_bool(self, v: bool) -> Out {
        Ok(PropertyValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Out {
        Ok(PropertyValue::Int(i32::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Out {
        Ok(PropertyValue::Int(i32::from(v)))
    }

    fn serialize_i32(self, v: i32) -> Out {
        Ok(PropertyValue::Int(v))
    }

    fn serialize_i64(self, v: i64) -> Out {
        Ok(PropertyValue::Long(v))
    }

    fn serialize_i128(self, v: i128) -> Out {
        i64::try_from(v)
            .map(PropertyValue::Long)
            .map_err(|_| Classify::Compound)
    }

    fn serialize_u8(self, v: u8) -> Out {
        Ok(PropertyValue::Int(i32::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Out {
        Ok(PropertyValue::Int(i32::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Out {
        Ok(small(i64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Out {
        // Above i64::MAX no scalar holds the value exactly.
        i64::try_from(v)
            .map(PropertyValue::Long)
            .map_err(|_| Classify::Compound)
    }

    fn serialize_u128(self, v: u128) -> Out {
        i64::try_from(v)
            .map(PropertyValue::Long)
            .map_err(|_| Classify::Compound)
    }

    fn serialize_f32(self, v: f32) -> Out {
        Ok(PropertyValue::Float(v))
    }

    fn serialize_f64(self, v: f64) -> Out {
        Ok(PropertyValue::Double(v))
    }

    fn serialize_char(self, v: char) -> Out {
        Ok(PropertyValue::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Out {
        Ok(PropertyValue::Text(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Out {
        Ok(PropertyValue::opaque(Bytes::copy_from_slice(v)))
    }

    fn serialize_none(self) -> Out {
        Err(Classify::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Out {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Out {
        Err(Classify::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Out {
        Err(Classify::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Out {
        Ok(PropertyValue::Text(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Out {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Out {
        Err(Classify::Compound)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Classify> {
        Err(Classify::Compound)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Classify> {
        Err(Classify::Compound)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Classify> {
        Err(Classify::Compound)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Classify> {
        Err(Classify::Compound)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Classify> {
        Err(Classify::Compound)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Classify> {
        Err(Classify::Compound)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Classify> {
        Err(Classify::Compound)
    }
}
