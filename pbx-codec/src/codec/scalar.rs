// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Singular scalar strategies.

use super::{FieldInfo, Presence};
use crate::error::Result;
use crate::schema::ScalarType;
use crate::value::Value;
use crate::wire::scalar::{
  Bool,
  Double,
  Fixed32,
  Fixed64,
  Float,
  Int32,
  Int64,
  NativeScalar,
  SFixed32,
  SFixed64,
  SInt32,
  SInt64,
  ScalarWire,
  UInt32,
  UInt64,
};
use crate::wire::{ProtoInput, ProtoOutput};
use bytes::Bytes;
use protobuf::rt::WireType;
use std::fmt;
use std::marker::PhantomData;

/// Coerces `value` into the native type of `W`, failing with an error naming the field.
pub(crate) fn coerce<W: ScalarWire>(field: &FieldInfo, value: &Value) -> Result<W::Native> {
  W::Native::from_value(value).ok_or_else(|| field.unsupported(value, W::SCALAR))
}

/// Parses `text` into the native type of `W`. Fails exactly like [`coerce`] on a string value.
pub(crate) fn coerce_text<W: ScalarWire>(field: &FieldInfo, text: &str) -> Result<W::Native> {
  W::Native::parse_text(text)
    .ok_or_else(|| field.unsupported(&Value::String(text.to_string()), W::SCALAR))
}

//
// ScalarCodec
//

pub trait ScalarCodec: fmt::Debug + Send + Sync {
  fn scalar_type(&self) -> ScalarType;

  fn write(
    &self,
    field: &FieldInfo,
    value: &Value,
    presence: Presence,
    out: &mut ProtoOutput<'_>,
  ) -> Result<()>;

  /// Reads one untagged value.
  fn read(&self, input: &mut ProtoInput<'_>) -> Result<Value>;

  fn default_value(&self) -> Value;
}

//
// Singular
//

/// The singular strategy of a numeric scalar type.
#[derive(Debug)]
pub struct Singular<W>(PhantomData<W>);

impl<W> Singular<W> {
  pub const INSTANCE: Self = Self(PhantomData);
}

impl<W: ScalarWire> ScalarCodec for Singular<W> {
  fn scalar_type(&self) -> ScalarType {
    W::SCALAR
  }

  fn write(
    &self,
    field: &FieldInfo,
    value: &Value,
    presence: Presence,
    out: &mut ProtoOutput<'_>,
  ) -> Result<()> {
    let native = coerce::<W>(field, value)?;
    if presence == Presence::Implicit && native.is_default() {
      return Ok(());
    }
    out.write_tag(field.number, W::WIRE_TYPE)?;
    W::write_no_tag(native, out.stream())?;
    Ok(())
  }

  fn read(&self, input: &mut ProtoInput<'_>) -> Result<Value> {
    Ok(W::read(input.stream())?.into_value())
  }

  fn default_value(&self) -> Value {
    W::Native::default().into_value()
  }
}

//
// StringCodec
//

#[derive(Debug)]
pub struct StringCodec;

impl StringCodec {
  pub(crate) fn text<'v>(field: &FieldInfo, value: &'v Value) -> Result<std::borrow::Cow<'v, str>> {
    match value {
      Value::String(text) | Value::Enum(text) => Ok(text.as_str().into()),
      Value::Bool(v) => Ok(v.to_string().into()),
      Value::I32(v) => Ok(v.to_string().into()),
      Value::I64(v) => Ok(v.to_string().into()),
      Value::U32(v) => Ok(v.to_string().into()),
      Value::U64(v) => Ok(v.to_string().into()),
      Value::F32(v) => Ok(v.to_string().into()),
      Value::F64(v) => Ok(v.to_string().into()),
      other => Err(field.unsupported(other, ScalarType::String)),
    }
  }
}

impl ScalarCodec for StringCodec {
  fn scalar_type(&self) -> ScalarType {
    ScalarType::String
  }

  fn write(
    &self,
    field: &FieldInfo,
    value: &Value,
    presence: Presence,
    out: &mut ProtoOutput<'_>,
  ) -> Result<()> {
    let text = Self::text(field, value)?;
    if presence == Presence::Implicit && text.is_empty() {
      return Ok(());
    }
    out.write_tag(field.number, WireType::LengthDelimited)?;
    out.stream().write_string_no_tag(&text)?;
    Ok(())
  }

  fn read(&self, input: &mut ProtoInput<'_>) -> Result<Value> {
    Ok(Value::String(input.stream().read_string()?))
  }

  fn default_value(&self) -> Value {
    Value::String(String::new())
  }
}

//
// BytesCodec
//

#[derive(Debug)]
pub struct BytesCodec;

impl BytesCodec {
  pub(crate) fn bytes<'v>(field: &FieldInfo, value: &'v Value) -> Result<&'v [u8]> {
    match value {
      Value::Bytes(bytes) => Ok(bytes),
      other => Err(field.unsupported(other, ScalarType::Bytes)),
    }
  }
}

impl ScalarCodec for BytesCodec {
  fn scalar_type(&self) -> ScalarType {
    ScalarType::Bytes
  }

  fn write(
    &self,
    field: &FieldInfo,
    value: &Value,
    presence: Presence,
    out: &mut ProtoOutput<'_>,
  ) -> Result<()> {
    let bytes = Self::bytes(field, value)?;
    if presence == Presence::Implicit && bytes.is_empty() {
      return Ok(());
    }
    out.write_tag(field.number, WireType::LengthDelimited)?;
    out.stream().write_bytes_no_tag(bytes)?;
    Ok(())
  }

  fn read(&self, input: &mut ProtoInput<'_>) -> Result<Value> {
    Ok(Value::Bytes(Bytes::from(input.stream().read_bytes()?)))
  }

  fn default_value(&self) -> Value {
    Value::Bytes(Bytes::new())
  }
}

/// The singular strategy for `scalar`.
#[must_use]
pub fn scalar_codec(scalar: ScalarType) -> &'static dyn ScalarCodec {
  match scalar {
    ScalarType::Bool => &Singular::<Bool>::INSTANCE,
    ScalarType::Int32 => &Singular::<Int32>::INSTANCE,
    ScalarType::Int64 => &Singular::<Int64>::INSTANCE,
    ScalarType::UInt32 => &Singular::<UInt32>::INSTANCE,
    ScalarType::UInt64 => &Singular::<UInt64>::INSTANCE,
    ScalarType::SInt32 => &Singular::<SInt32>::INSTANCE,
    ScalarType::SInt64 => &Singular::<SInt64>::INSTANCE,
    ScalarType::Fixed32 => &Singular::<Fixed32>::INSTANCE,
    ScalarType::Fixed64 => &Singular::<Fixed64>::INSTANCE,
    ScalarType::SFixed32 => &Singular::<SFixed32>::INSTANCE,
    ScalarType::SFixed64 => &Singular::<SFixed64>::INSTANCE,
    ScalarType::Float => &Singular::<Float>::INSTANCE,
    ScalarType::Double => &Singular::<Double>::INSTANCE,
    ScalarType::String => &StringCodec,
    ScalarType::Bytes => &BytesCodec,
  }
}
