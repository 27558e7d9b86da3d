// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! `map<K, V>` fields.
//!
//! Each entry is a length-delimited message with the key in field 1 and the value in field 2.
//! In memory a map is a [`Record`] keyed by the key's text form.

use super::scalar::ScalarCodec;
use super::{FieldCodec, FieldInfo, Presence};
use crate::error::Result;
use crate::value::{Record, Value};
use crate::wire::{ProtoInput, ProtoOutput};
use protobuf::rt::WireType;

const KEY_FIELD: u32 = 1;
const VALUE_FIELD: u32 = 2;

#[derive(Debug)]
pub struct MapCodec {
  key: &'static dyn ScalarCodec,
  key_info: FieldInfo,
  value: FieldCodec,
  value_info: FieldInfo,
}

impl MapCodec {
  #[must_use]
  pub fn new(
    field: &FieldInfo,
    key: &'static dyn ScalarCodec,
    value: FieldCodec,
    value_wire_type: WireType,
  ) -> Self {
    Self {
      key,
      key_info: FieldInfo::map_entry(field, "key", KEY_FIELD, key.scalar_type().wire_type()),
      value,
      value_info: FieldInfo::map_entry(field, "value", VALUE_FIELD, value_wire_type),
    }
  }

  #[must_use]
  pub const fn value_codec(&self) -> &FieldCodec {
    &self.value
  }

  pub fn write(&self, field: &FieldInfo, value: &Value, out: &mut ProtoOutput<'_>) -> Result<()> {
    let Value::Record(entries) = value else {
      return Err(field.unsupported(value, "map"));
    };

    for (key, value) in entries {
      if value.is_null() {
        return Err(field.null_element());
      }
      out.write_length_delimited(field.number, |out| {
        self.key.write(
          &self.key_info,
          &Value::String(key.clone()),
          Presence::Explicit,
          out,
        )?;
        self
          .value
          .write(&self.value_info, value, Presence::Explicit, out)
      })?;
    }
    Ok(())
  }

  pub fn read(&self, field: &FieldInfo, input: &mut ProtoInput<'_>) -> Result<(Value, u32)> {
    let mut entries = Record::new();
    loop {
      let (key, value) = input.read_nested(|input| self.read_entry(input))?;
      entries.insert(key, value);

      let next = input.read_field_number()?;
      if next != field.number || input.last_wire_type()? != WireType::LengthDelimited {
        return Ok((Value::Record(entries), next));
      }
    }
  }

  fn read_entry(&self, input: &mut ProtoInput<'_>) -> Result<(String, Value)> {
    let mut key = None;
    let mut value = None;
    let mut number = input.read_field_number()?;
    while number != 0 {
      let wire_type = input.last_wire_type()?;
      if number == KEY_FIELD && self.key_info.accepts(wire_type) {
        key = Some(self.key.read(input)?);
        number = input.read_field_number()?;
      } else if number == VALUE_FIELD && self.value_info.accepts(wire_type) {
        let (read, next) = self.value.read(&self.value_info, input)?;
        value = Some(read);
        number = next;
      } else {
        input.skip_field(wire_type)?;
        number = input.read_field_number()?;
      }
    }

    let key = key.unwrap_or_else(|| self.key.default_value());
    Ok((
      key_text(&key),
      value.unwrap_or_else(|| self.value.default_value()),
    ))
  }
}

fn key_text(key: &Value) -> String {
  match key {
    Value::String(text) => text.clone(),
    Value::Bool(v) => v.to_string(),
    Value::I32(v) => v.to_string(),
    Value::I64(v) => v.to_string(),
    Value::U32(v) => v.to_string(),
    Value::U64(v) => v.to_string(),
    other => other.type_name(),
  }
}
