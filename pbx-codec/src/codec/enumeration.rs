// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Enum fields.
//!
//! Encoding accepts a number or a symbol and validates it against the proto enum. Decoding
//! always produces the raw number as [`Value::I32`], whether or not the proto enum defines it.
//! Mapping numbers onto application enum symbols happens later, during shape conversion.

#[cfg(test)]
#[path = "./enumeration_test.rs"]
mod tests;

use super::repeated::read_repeated;
use super::{FieldInfo, Presence, Representation};
use crate::error::{Error, Result};
use crate::schema::EnumDef;
use crate::value::{PrimitiveArray, Value};
use crate::wire::chunked::ChunkedBuffer;
use crate::wire::{ProtoInput, ProtoOutput};
use protobuf::rt::WireType;
use std::fmt;
use std::sync::Arc;

fn read_number(input: &mut ProtoInput<'_>) -> Result<i32> {
  Ok(input.stream().read_int32()?)
}

#[derive(Debug, Clone)]
pub struct EnumCodec {
  enum_def: Arc<EnumDef>,
}

impl EnumCodec {
  #[must_use]
  pub const fn new(enum_def: Arc<EnumDef>) -> Self {
    Self { enum_def }
  }

  #[must_use]
  pub const fn enum_def(&self) -> &Arc<EnumDef> {
    &self.enum_def
  }

  fn invalid(&self, field: &FieldInfo, value: impl ToString) -> Error {
    Error::InvalidEnumValue {
      field: field.qualified.clone(),
      enum_name: self.enum_def.full_name.clone(),
      value: value.to_string(),
    }
  }

  fn check_number<N>(&self, field: &FieldInfo, number: N) -> Result<i32>
  where
    N: Copy + fmt::Display,
    i32: TryFrom<N>,
  {
    i32::try_from(number)
      .ok()
      .filter(|number| self.enum_def.contains_number(*number))
      .ok_or_else(|| self.invalid(field, number))
  }

  /// Resolves a number or symbol to a number defined by the proto enum.
  pub fn to_number(&self, field: &FieldInfo, value: &Value) -> Result<i32> {
    match value {
      Value::I32(number) => self.check_number(field, *number),
      Value::I64(number) => self.check_number(field, *number),
      Value::U32(number) => self.check_number(field, *number),
      Value::U64(number) => self.check_number(field, *number),
      Value::String(symbol) | Value::Enum(symbol) => self
        .enum_def
        .number_of(symbol)
        .ok_or_else(|| self.invalid(field, symbol)),
      other => Err(field.unsupported(other, format!("enum {}", self.enum_def.full_name))),
    }
  }

  pub fn write(
    &self,
    field: &FieldInfo,
    value: &Value,
    presence: Presence,
    out: &mut ProtoOutput<'_>,
  ) -> Result<()> {
    let number = self.to_number(field, value)?;
    if presence == Presence::Implicit && number == 0 {
      return Ok(());
    }
    out.write_tag(field.number, WireType::Varint)?;
    out.stream().write_enum_no_tag(number)?;
    Ok(())
  }

  pub fn read(&self, input: &mut ProtoInput<'_>) -> Result<Value> {
    read_number(input).map(Value::I32)
  }

  pub fn write_repeated(&self, field: &FieldInfo, value: &Value, out: &mut ProtoOutput<'_>) -> Result<()> {
    let numbers = match value {
      Value::PrimitiveArray(array) => array
        .to_values()
        .iter()
        .map(|value| self.to_number(field, value))
        .collect::<Result<Vec<_>>>()?,
      Value::Array(items) | Value::List(items) => items
        .iter()
        .map(|value| {
          if value.is_null() {
            return Err(field.null_element());
          }
          self.to_number(field, value)
        })
        .collect::<Result<Vec<_>>>()?,
      Value::StringArray(items) => items
        .iter()
        .map(|item| {
          let symbol = item.as_deref().ok_or_else(|| field.null_element())?;
          self.to_number(field, &Value::String(symbol.to_string()))
        })
        .collect::<Result<Vec<_>>>()?,
      other => {
        return Err(field.unsupported(other, format!("repeated enum {}", self.enum_def.full_name)));
      },
    };

    if numbers.is_empty() {
      return Ok(());
    }
    if field.packed {
      out.write_packed(field.number, |out| {
        for number in &numbers {
          out.stream().write_enum_no_tag(*number)?;
        }
        Ok(())
      })
    } else {
      for number in numbers {
        out.write_tag(field.number, WireType::Varint)?;
        out.stream().write_enum_no_tag(number)?;
      }
      Ok(())
    }
  }

  pub fn read_repeated(
    &self,
    field: &FieldInfo,
    repr: Representation,
    input: &mut ProtoInput<'_>,
  ) -> Result<(Value, u32)> {
    match repr {
      Representation::PrimitiveArray => {
        let mut buffer = ChunkedBuffer::new(input.options().primitive_chunk_len);
        let next = read_repeated(field, input, read_number, |n| buffer.push(n))?;
        Ok((Value::PrimitiveArray(PrimitiveArray::I32(buffer.into_vec())), next))
      },
      Representation::StringArray => {
        let mut values = Vec::new();
        let next = read_repeated(field, input, read_number, |n: i32| {
          let symbol = self
            .enum_def
            .name_of(n)
            .map_or_else(|| n.to_string(), str::to_string);
          values.push(Some(symbol));
        })?;
        Ok((Value::StringArray(values), next))
      },
      Representation::ObjectArray | Representation::Collection => {
        let mut values = Vec::new();
        let next = read_repeated(field, input, read_number, |n| values.push(Value::I32(n)))?;
        Ok((repr.wrap(values), next))
      },
    }
  }
}
