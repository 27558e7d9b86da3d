// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Repeated scalar strategies.
//!
//! One static strategy exists per (scalar type, packed) pair. Each can write any of the four
//! sequence representations and read into the representation chosen for the field. Writers
//! differ only in framing: packed writes one length-delimited blob, unpacked one tag per
//! element. Readers are shared and accept both framings, since either may be on the wire.

#[cfg(test)]
#[path = "./repeated_test.rs"]
mod tests;

use super::scalar::{BytesCodec, StringCodec, coerce, coerce_text};
use super::{FieldInfo, Representation};
use crate::error::Result;
use crate::schema::ScalarType;
use crate::value::{PrimitiveArray, Value};
use crate::wire::chunked::ChunkedBuffer;
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

//
// RepeatedScalarCodec
//

/// Capability set of a repeated scalar strategy. Not every strategy supports every
/// representation: string and bytes fields have no primitive array form, and bytes have no
/// string array form. Unsupported operations fail with an unsupported conversion.
pub trait RepeatedScalarCodec: fmt::Debug + Send + Sync {
  fn scalar_type(&self) -> ScalarType;

  fn is_packed(&self) -> bool;

  fn write_primitive_array(
    &self,
    field: &FieldInfo,
    values: &PrimitiveArray,
    out: &mut ProtoOutput<'_>,
  ) -> Result<()>;

  /// Writes boxed elements from an object array or collection. Null elements are rejected.
  fn write_values(&self, field: &FieldInfo, values: &[Value], out: &mut ProtoOutput<'_>)
  -> Result<()>;

  /// Writes string array elements, parsing each into the scalar type. Null elements are
  /// rejected.
  fn write_strings(
    &self,
    field: &FieldInfo,
    values: &[Option<String>],
    out: &mut ProtoOutput<'_>,
  ) -> Result<()>;

  fn read_primitive_array(
    &self,
    field: &FieldInfo,
    input: &mut ProtoInput<'_>,
  ) -> Result<(PrimitiveArray, u32)>;

  fn read_values(&self, field: &FieldInfo, input: &mut ProtoInput<'_>) -> Result<(Vec<Value>, u32)>;

  fn read_strings(
    &self,
    field: &FieldInfo,
    input: &mut ProtoInput<'_>,
  ) -> Result<(Vec<Option<String>>, u32)>;

  /// Reads into `repr`.
  fn read(
    &self,
    field: &FieldInfo,
    repr: Representation,
    input: &mut ProtoInput<'_>,
  ) -> Result<(Value, u32)> {
    Ok(match repr {
      Representation::PrimitiveArray => {
        let (values, next) = self.read_primitive_array(field, input)?;
        (Value::PrimitiveArray(values), next)
      },
      Representation::StringArray => {
        let (values, next) = self.read_strings(field, input)?;
        (Value::StringArray(values), next)
      },
      Representation::ObjectArray | Representation::Collection => {
        let (values, next) = self.read_values(field, input)?;
        (repr.wrap(values), next)
      },
    })
  }
}

/// Reads every element of a repeated field, packed or unpacked, handing each to `sink`.
///
/// Entered after the field's tag was read. Keeps going while the following tags belong to the
/// same field and returns the first field number that does not.
pub(crate) fn read_repeated<N>(
  field: &FieldInfo,
  input: &mut ProtoInput<'_>,
  mut read_one: impl FnMut(&mut ProtoInput<'_>) -> Result<N>,
  mut sink: impl FnMut(N),
) -> Result<u32> {
  loop {
    if field.wire_type != WireType::LengthDelimited
      && input.last_wire_type()? == WireType::LengthDelimited
    {
      input.read_packed(|input| {
        sink(read_one(input)?);
        Ok(())
      })?;
    } else {
      sink(read_one(input)?);
    }

    let next = input.read_field_number()?;
    if next != field.number || !field.accepts(input.last_wire_type()?) {
      return Ok(next);
    }
  }
}

fn reject_null<T>(field: &FieldInfo, value: Option<T>) -> Result<T> {
  value.ok_or_else(|| field.null_element())
}

//
// RepeatedScalar
//

/// The repeated strategy of a numeric scalar type.
#[derive(Debug)]
pub struct RepeatedScalar<W, const PACKED: bool>(PhantomData<W>);

impl<W, const PACKED: bool> RepeatedScalar<W, PACKED> {
  pub const INSTANCE: Self = Self(PhantomData);
}

pub type Packed<W> = RepeatedScalar<W, true>;
pub type Unpacked<W> = RepeatedScalar<W, false>;

impl<W: ScalarWire, const PACKED: bool> RepeatedScalar<W, PACKED> {
  fn write_natives(field: &FieldInfo, values: &[W::Native], out: &mut ProtoOutput<'_>) -> Result<()> {
    if values.is_empty() {
      return Ok(());
    }

    if PACKED {
      out.write_packed(field.number, |out| {
        for value in values {
          W::write_no_tag(*value, out.stream())?;
        }
        Ok(())
      })
    } else {
      for value in values {
        out.write_tag(field.number, W::WIRE_TYPE)?;
        W::write_no_tag(*value, out.stream())?;
      }
      Ok(())
    }
  }

  fn read_natives(
    field: &FieldInfo,
    input: &mut ProtoInput<'_>,
    sink: impl FnMut(W::Native),
  ) -> Result<u32> {
    read_repeated(field, input, |input| Ok(W::read(input.stream())?), sink)
  }
}

impl<W: ScalarWire, const PACKED: bool> RepeatedScalarCodec for RepeatedScalar<W, PACKED> {
  fn scalar_type(&self) -> ScalarType {
    W::SCALAR
  }

  fn is_packed(&self) -> bool {
    PACKED
  }

  fn write_primitive_array(
    &self,
    field: &FieldInfo,
    values: &PrimitiveArray,
    out: &mut ProtoOutput<'_>,
  ) -> Result<()> {
    if let Some(natives) = W::Native::slice(values) {
      return Self::write_natives(field, natives, out);
    }

    // An array of another kind, e.g. an i32 array for an int64 field, is widened element by
    // element.
    let natives = values
      .to_values()
      .iter()
      .map(|value| coerce::<W>(field, value))
      .collect::<Result<Vec<_>>>()?;
    Self::write_natives(field, &natives, out)
  }

  fn write_values(&self, field: &FieldInfo, values: &[Value], out: &mut ProtoOutput<'_>)
  -> Result<()> {
    let natives = values
      .iter()
      .map(|value| {
        if value.is_null() {
          return Err(field.null_element());
        }
        coerce::<W>(field, value)
      })
      .collect::<Result<Vec<_>>>()?;
    Self::write_natives(field, &natives, out)
  }

  fn write_strings(
    &self,
    field: &FieldInfo,
    values: &[Option<String>],
    out: &mut ProtoOutput<'_>,
  ) -> Result<()> {
    let natives = values
      .iter()
      .map(|value| coerce_text::<W>(field, reject_null(field, value.as_deref())?))
      .collect::<Result<Vec<_>>>()?;
    Self::write_natives(field, &natives, out)
  }

  fn read_primitive_array(
    &self,
    field: &FieldInfo,
    input: &mut ProtoInput<'_>,
  ) -> Result<(PrimitiveArray, u32)> {
    let mut buffer = ChunkedBuffer::new(input.options().primitive_chunk_len);
    let next = Self::read_natives(field, input, |value| buffer.push(value))?;
    Ok((W::Native::wrap(buffer.into_vec()), next))
  }

  fn read_values(&self, field: &FieldInfo, input: &mut ProtoInput<'_>) -> Result<(Vec<Value>, u32)> {
    let mut values = Vec::new();
    let next = Self::read_natives(field, input, |value| values.push(value.into_value()))?;
    Ok((values, next))
  }

  fn read_strings(
    &self,
    field: &FieldInfo,
    input: &mut ProtoInput<'_>,
  ) -> Result<(Vec<Option<String>>, u32)> {
    let mut values = Vec::new();
    let next = Self::read_natives(field, input, |value| values.push(Some(value.to_string())))?;
    Ok((values, next))
  }
}

//
// RepeatedString
//

/// Repeated `string`. Never packed.
#[derive(Debug)]
pub struct RepeatedString;

impl RepeatedString {
  fn write_texts<'v>(
    field: &FieldInfo,
    texts: impl Iterator<Item = Result<&'v str>>,
    out: &mut ProtoOutput<'_>,
  ) -> Result<()> {
    for text in texts {
      let text = text?;
      out.write_tag(field.number, WireType::LengthDelimited)?;
      out.stream().write_string_no_tag(text)?;
    }
    Ok(())
  }

  fn read_texts(
    field: &FieldInfo,
    input: &mut ProtoInput<'_>,
    sink: impl FnMut(String),
  ) -> Result<u32> {
    read_repeated(field, input, |input| Ok(input.stream().read_string()?), sink)
  }
}

impl RepeatedScalarCodec for RepeatedString {
  fn scalar_type(&self) -> ScalarType {
    ScalarType::String
  }

  fn is_packed(&self) -> bool {
    false
  }

  fn write_primitive_array(
    &self,
    field: &FieldInfo,
    values: &PrimitiveArray,
    out: &mut ProtoOutput<'_>,
  ) -> Result<()> {
    self.write_values(field, &values.to_values(), out)
  }

  fn write_values(&self, field: &FieldInfo, values: &[Value], out: &mut ProtoOutput<'_>)
  -> Result<()> {
    // Elements are validated before anything is written.
    let texts = values
      .iter()
      .map(|value| {
        if value.is_null() {
          return Err(field.null_element());
        }
        StringCodec::text(field, value)
      })
      .collect::<Result<Vec<_>>>()?;
    Self::write_texts(field, texts.iter().map(|text| Ok(text.as_ref())), out)
  }

  fn write_strings(
    &self,
    field: &FieldInfo,
    values: &[Option<String>],
    out: &mut ProtoOutput<'_>,
  ) -> Result<()> {
    let texts = values
      .iter()
      .map(|value| reject_null(field, value.as_deref()))
      .collect::<Result<Vec<_>>>()?;
    Self::write_texts(field, texts.into_iter().map(Ok), out)
  }

  fn read_primitive_array(
    &self,
    field: &FieldInfo,
    _input: &mut ProtoInput<'_>,
  ) -> Result<(PrimitiveArray, u32)> {
    Err(field.unsupported(&Value::List(Vec::new()), "primitive array of string"))
  }

  fn read_values(&self, field: &FieldInfo, input: &mut ProtoInput<'_>) -> Result<(Vec<Value>, u32)> {
    let mut values = Vec::new();
    let next = Self::read_texts(field, input, |text| values.push(Value::String(text)))?;
    Ok((values, next))
  }

  fn read_strings(
    &self,
    field: &FieldInfo,
    input: &mut ProtoInput<'_>,
  ) -> Result<(Vec<Option<String>>, u32)> {
    let mut values = Vec::new();
    let next = Self::read_texts(field, input, |text| values.push(Some(text)))?;
    Ok((values, next))
  }
}

//
// RepeatedBytes
//

/// Repeated `bytes`. Never packed, and only held as boxed sequences.
#[derive(Debug)]
pub struct RepeatedBytes;

impl RepeatedScalarCodec for RepeatedBytes {
  fn scalar_type(&self) -> ScalarType {
    ScalarType::Bytes
  }

  fn is_packed(&self) -> bool {
    false
  }

  fn write_primitive_array(
    &self,
    field: &FieldInfo,
    values: &PrimitiveArray,
    _out: &mut ProtoOutput<'_>,
  ) -> Result<()> {
    Err(field.unsupported(&Value::PrimitiveArray(values.clone()), "repeated bytes"))
  }

  fn write_values(&self, field: &FieldInfo, values: &[Value], out: &mut ProtoOutput<'_>)
  -> Result<()> {
    let chunks = values
      .iter()
      .map(|value| {
        if value.is_null() {
          return Err(field.null_element());
        }
        BytesCodec::bytes(field, value)
      })
      .collect::<Result<Vec<_>>>()?;
    for chunk in chunks {
      out.write_tag(field.number, WireType::LengthDelimited)?;
      out.stream().write_bytes_no_tag(chunk)?;
    }
    Ok(())
  }

  fn write_strings(
    &self,
    field: &FieldInfo,
    values: &[Option<String>],
    _out: &mut ProtoOutput<'_>,
  ) -> Result<()> {
    Err(field.unsupported(&Value::StringArray(values.to_vec()), "repeated bytes"))
  }

  fn read_primitive_array(
    &self,
    field: &FieldInfo,
    _input: &mut ProtoInput<'_>,
  ) -> Result<(PrimitiveArray, u32)> {
    Err(field.unsupported(&Value::List(Vec::new()), "primitive array of bytes"))
  }

  fn read_values(&self, field: &FieldInfo, input: &mut ProtoInput<'_>) -> Result<(Vec<Value>, u32)> {
    let mut values = Vec::new();
    let next = read_repeated(
      field,
      input,
      |input| Ok(Bytes::from(input.stream().read_bytes()?)),
      |bytes| values.push(Value::Bytes(bytes)),
    )?;
    Ok((values, next))
  }

  fn read_strings(
    &self,
    field: &FieldInfo,
    _input: &mut ProtoInput<'_>,
  ) -> Result<(Vec<Option<String>>, u32)> {
    Err(field.unsupported(&Value::List(Vec::new()), "string array of bytes"))
  }
}

macro_rules! repeated_lookup {
  ($scalar:expr, $packed:expr; $($variant:ident => $wire:ty),* $(,)?) => {
    match ($scalar, $packed) {
      $(
        (ScalarType::$variant, true) => &Packed::<$wire>::INSTANCE,
        (ScalarType::$variant, false) => &Unpacked::<$wire>::INSTANCE,
      )*
      (ScalarType::String, _) => &RepeatedString,
      (ScalarType::Bytes, _) => &RepeatedBytes,
    }
  };
}

/// The repeated strategy for `(scalar, packed)`. Packing is ignored for string and bytes.
#[must_use]
pub fn repeated_scalar_codec(scalar: ScalarType, packed: bool) -> &'static dyn RepeatedScalarCodec {
  repeated_lookup!(scalar, packed;
    Bool => Bool,
    Int32 => Int32,
    Int64 => Int64,
    UInt32 => UInt32,
    UInt64 => UInt64,
    SInt32 => SInt32,
    SInt64 => SInt64,
    Fixed32 => Fixed32,
    Fixed64 => Fixed64,
    SFixed32 => SFixed32,
    SFixed64 => SFixed64,
    Float => Float,
    Double => Double,
  )
}
